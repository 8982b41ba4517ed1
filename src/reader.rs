//! Packet reader
//!
//! [`PacketReader`] opens a capture file, detects its format (looking through zstd
//! compression), and yields packets one at a time. Packet data borrows from the reader:
//! a packet is valid until the next call to [`PacketReader::next_packet`].

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use memmap2::Mmap;
use nom::Err;

use crate::config::ReaderOptions;
use crate::decompress::{Compression, DecompressReader};
use crate::magic::{detect_format, FormatInfo, MagicNumber};
use crate::packet::{Packet, ParseStep, RawRecord, TraceInterface};
use crate::pcap::parser::LegacyPcapParser;
use crate::pcap::{parse_pcap_header, PcapHeader, PCAP_HEADER_LEN};
use crate::pcapng::parser::PcapNGParser;
use crate::pcapng::SHB_MIN_LEN;
use crate::source::{ByteSource, Input, Refill};
use crate::utils::Data;
use crate::PcapError;

/// Bytes needed to classify a stream, including the PCAPNG byte-order magic
const DETECT_LEN: usize = 12;

/// Why a reader stopped producing packets
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Termination {
    /// All records were read
    EndOfStream,
    /// Iteration stopped on an error, described here
    Failed(String),
}

enum FormatParser {
    Legacy(LegacyPcapParser),
    Ng(PcapNGParser),
}

impl FormatParser {
    fn step(&mut self, i: &[u8]) -> Result<ParseStep, Err<PcapError>> {
        match self {
            FormatParser::Legacy(p) => p.step(i),
            FormatParser::Ng(p) => p.step(i),
        }
    }
}

/// Reader over a PCAP, PCAPNG or zstd-compressed capture file
///
/// ```rust,no_run
/// use fpcap::PacketReader;
///
/// # fn main() -> Result<(), fpcap::PcapError> {
/// let mut reader = PacketReader::new("capture.pcapng", true)?;
/// while let Some(packet) = reader.next_packet()? {
///     println!("{}.{:06} {} bytes", packet.timestamp_seconds,
///              packet.timestamp_microseconds, packet.capture_length);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PacketReader {
    path: PathBuf,
    source: ByteSource,
    parser: FormatParser,
    format: FormatInfo,
    payload_format: FormatInfo,
    /// First packet record, located while reading the file prelude
    peeked: Option<RawRecord>,
    /// Error met while reading the prelude, returned by the first `next_packet`
    deferred: Option<PcapError>,
    /// Bytes of the last returned packet, consumed on the next call
    pending_consume: usize,
    /// Position of the first unconsumed byte, in the (decompressed) stream
    offset: u64,
    packets_read: u64,
    termination: Option<Termination>,
}

impl PacketReader {
    /// Open `path`, memory-mapping it if `use_mmap` is true
    pub fn new<P: AsRef<Path>>(path: P, use_mmap: bool) -> Result<PacketReader, PcapError> {
        let options = ReaderOptions::default().mmap(use_mmap);
        Self::with_options(path, &options)
    }

    pub fn with_options<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<PacketReader, PcapError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let mmap = if options.use_mmap {
            // SAFETY: the mapping is read-only; the file must not be truncated while reading
            match unsafe { Mmap::map(&file) } {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!("cannot map {:?} ({}), using buffered reads", path, e);
                    None
                }
            }
        } else {
            None
        };
        let prefix = match &mmap {
            Some(m) => m[..m.len().min(DETECT_LEN)].to_vec(),
            None => {
                let mut prefix = Vec::with_capacity(DETECT_LEN);
                (&mut file).take(DETECT_LEN as u64).read_to_end(&mut prefix)?;
                file.rewind()?;
                prefix
            }
        };
        let format = detect_format(&prefix)?;
        debug!("{:?}: detected {} (big-endian: {})", path, format.magic, format.big_endian);

        let mut source = match (format.magic, mmap) {
            (MagicNumber::Zstd, mmap) => {
                let input = match mmap {
                    Some(m) => Input::Mapped(Cursor::new(m)),
                    None => Input::File(file),
                };
                let reader = DecompressReader::new(input, Compression::Zstd)
                    .map_err(|e| PcapError::CorruptStream(e.to_string()))?;
                ByteSource::stream(reader, options.buffer_capacity, options.max_buffer_size)
            }
            (_, Some(m)) => ByteSource::mapped(m),
            (_, None) => ByteSource::stream(
                DecompressReader::None(Input::File(file)),
                options.buffer_capacity,
                options.max_buffer_size,
            ),
        };

        let payload_format = if format.magic == MagicNumber::Zstd {
            source.fill_at_least(DETECT_LEN)?;
            let inner = detect_format(source.data())?;
            if inner.magic == MagicNumber::Zstd {
                return Err(PcapError::UnrecognizedFormat(MagicNumber::Zstd.value()));
            }
            debug!("compressed payload: {}", inner.magic);
            inner
        } else {
            format
        };

        let (parser, offset) = if payload_format.magic == MagicNumber::Pcapng {
            (FormatParser::Ng(PcapNGParser::new()), 0)
        } else {
            let header = read_legacy_header(&mut source)?;
            debug!(
                "pcap header: version {}.{}, snaplen {}, link type {}",
                header.version_major, header.version_minor, header.snaplen, header.network
            );
            let max_caplen = options.max_buffer_size.saturating_sub(header.record_header_len());
            (FormatParser::Legacy(LegacyPcapParser::new(header, max_caplen)), PCAP_HEADER_LEN as u64)
        };

        let mut reader = PacketReader {
            path,
            source,
            parser,
            format,
            payload_format,
            peeked: None,
            deferred: None,
            pending_consume: 0,
            offset,
            packets_read: 0,
            termination: None,
        };
        reader.read_prelude()?;
        Ok(reader)
    }

    /// Read metadata blocks up to the first packet
    ///
    /// A damaged first section header fails the construction. Later errors are kept
    /// for the first call to `next_packet`, so that metadata read so far stays available.
    fn read_prelude(&mut self) -> Result<(), PcapError> {
        if let FormatParser::Ng(_) = self.parser {
            match self.advance() {
                Ok(Some(record)) => self.peeked = Some(record),
                Ok(None) => (),
                Err(e) => {
                    if self.ng_sections() == 0 {
                        return Err(e);
                    }
                    self.deferred = Some(e);
                }
            }
        }
        Ok(())
    }

    fn ng_sections(&self) -> usize {
        match &self.parser {
            FormatParser::Ng(p) => p.sections(),
            FormatParser::Legacy(_) => 0,
        }
    }

    /// Run the parser until a packet record is found
    ///
    /// Returns `Ok(None)` at a clean end of stream.
    fn advance(&mut self) -> Result<Option<RawRecord>, PcapError> {
        loop {
            let data = self.source.data();
            let available = data.len();
            match self.parser.step(data) {
                Ok(ParseStep::Packet(record)) => return Ok(Some(record)),
                Ok(ParseStep::Skip(n)) => {
                    self.source.consume(n);
                    self.offset += n as u64;
                }
                Err(Err::Incomplete(_)) => match self.source.refill()? {
                    Refill::Filled => (),
                    // detection guarantees a non-empty stream
                    Refill::Eof if available == 0 => return Ok(None),
                    Refill::Eof => return Err(self.truncated(available)),
                    Refill::Full => return Err(self.oversized()),
                },
                Err(Err::Error(e)) | Err(Err::Failure(e)) => return Err(e.at_offset(self.offset)),
            }
        }
    }

    fn truncated(&self, available: usize) -> PcapError {
        match &self.parser {
            FormatParser::Legacy(_) => PcapError::TruncatedRecord { offset: self.offset },
            FormatParser::Ng(p) if p.sections() == 0 => PcapError::TruncatedHeader {
                needed: SHB_MIN_LEN,
                available,
            },
            FormatParser::Ng(_) => PcapError::CorruptBlock {
                offset: self.offset,
                reason: "block extends past end of stream",
            },
        }
    }

    fn oversized(&self) -> PcapError {
        match &self.parser {
            FormatParser::Legacy(_) => PcapError::MalformedRecord {
                offset: self.offset,
                reason: "record larger than buffer limit",
            },
            FormatParser::Ng(_) => PcapError::CorruptBlock {
                offset: self.offset,
                reason: "block larger than buffer limit",
            },
        }
    }

    fn fail(&mut self, e: PcapError) -> PcapError {
        warn!("{:?}: reading stopped after {} packets: {}", self.path, self.packets_read, e);
        self.termination = Some(Termination::Failed(e.to_string()));
        e
    }

    /// Read the next packet
    ///
    /// Returns `Ok(None)` once the reader is exhausted. An error ends iteration: it is
    /// returned once, and later calls return `Ok(None)`.
    pub fn next_packet(&mut self) -> Result<Option<Packet<'_>>, PcapError> {
        if self.pending_consume > 0 {
            self.source.consume(self.pending_consume);
            self.offset += self.pending_consume as u64;
            self.pending_consume = 0;
        }
        if self.termination.is_some() {
            return Ok(None);
        }
        if let Some(e) = self.deferred.take() {
            return Err(self.fail(e));
        }
        let record = match self.peeked.take() {
            Some(r) => r,
            None => match self.advance() {
                Ok(Some(r)) => r,
                Ok(None) => {
                    debug!("{:?}: end of stream after {} packets", self.path, self.packets_read);
                    self.termination = Some(Termination::EndOfStream);
                    return Ok(None);
                }
                Err(e) => return Err(self.fail(e)),
            },
        };
        if self.source.data().get(record.data_range()).is_none() {
            let e = PcapError::CorruptBlock {
                offset: self.offset,
                reason: "packet data out of bounds",
            };
            return Err(self.fail(e));
        }
        self.pending_consume = record.consumed;
        self.packets_read += 1;
        let data = &self.source.data()[record.data_range()];
        Ok(Some(Packet {
            timestamp_seconds: record.timestamp_seconds,
            timestamp_microseconds: record.timestamp_microseconds,
            capture_length: record.capture_length,
            original_length: record.original_length,
            data_link_type: record.data_link_type,
            interface_index: record.interface_index,
            data: Data::Borrowed(data),
        }))
    }

    /// Iterate over the remaining packets, copying their data
    pub fn owned_packets(&mut self) -> OwnedPackets<'_> {
        OwnedPackets { reader: self }
    }

    /// True once no further packet can be produced
    pub fn is_exhausted(&self) -> bool {
        self.termination.is_some()
    }

    /// Why iteration stopped, if it did
    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    pub fn filepath(&self) -> &Path {
        &self.path
    }

    /// Format of the file, as detected from its first bytes
    pub fn format(&self) -> FormatInfo {
        self.format
    }

    /// Format of the capture itself (differs from `format` for compressed files)
    pub fn payload_format(&self) -> FormatInfo {
        self.payload_format
    }

    pub fn is_compressed(&self) -> bool {
        self.source.is_compressed()
    }

    pub fn packets_read(&self) -> u64 {
        self.packets_read
    }

    fn metadata(&self) -> Option<&crate::packet::CaptureMetadata> {
        match &self.parser {
            FormatParser::Ng(p) => Some(p.metadata()),
            FormatParser::Legacy(_) => None,
        }
    }

    /// `opt_comment` of the first section
    pub fn comment(&self) -> Option<&str> {
        self.metadata().and_then(|m| m.comment.as_deref())
    }

    /// `shb_os` of the first section
    pub fn os(&self) -> Option<&str> {
        self.metadata().and_then(|m| m.os.as_deref())
    }

    /// `shb_hardware` of the first section
    pub fn hardware(&self) -> Option<&str> {
        self.metadata().and_then(|m| m.hardware.as_deref())
    }

    /// `shb_userappl` of the first section
    pub fn user_application(&self) -> Option<&str> {
        self.metadata().and_then(|m| m.user_application.as_deref())
    }

    /// Interfaces declared so far, for all sections
    ///
    /// Legacy files have a single interface describing the global header.
    pub fn trace_interfaces(&self) -> &[TraceInterface] {
        match &self.parser {
            FormatParser::Legacy(p) => p.interfaces(),
            FormatParser::Ng(p) => p.interfaces(),
        }
    }

    pub fn trace_interface(&self, index: usize) -> Result<&TraceInterface, PcapError> {
        self.trace_interfaces()
            .get(index)
            .ok_or(PcapError::InterfaceNotFound(index))
    }

    /// Global header of a legacy file
    pub(crate) fn legacy_header(&self) -> Option<&PcapHeader> {
        match &self.parser {
            FormatParser::Legacy(p) => Some(p.header()),
            FormatParser::Ng(_) => None,
        }
    }

    /// Byte order and interfaces of the last section of a PCAPNG file
    pub(crate) fn last_section(&self) -> Option<(bool, &[TraceInterface])> {
        match &self.parser {
            FormatParser::Ng(p) if p.sections() > 0 => Some((p.section_big_endian(), p.section_interfaces())),
            _ => None,
        }
    }
}

fn read_legacy_header(source: &mut ByteSource) -> Result<PcapHeader, PcapError> {
    let available = source.fill_at_least(PCAP_HEADER_LEN)?;
    if available < PCAP_HEADER_LEN {
        return Err(PcapError::TruncatedHeader {
            needed: PCAP_HEADER_LEN,
            available,
        });
    }
    let header = match parse_pcap_header(source.data()) {
        Ok((_, header)) => header,
        Err(Err::Error(e)) | Err(Err::Failure(e)) => return Err(e),
        Err(Err::Incomplete(_)) => {
            return Err(PcapError::TruncatedHeader {
                needed: PCAP_HEADER_LEN,
                available,
            })
        }
    };
    source.consume(PCAP_HEADER_LEN);
    Ok(header)
}

/// Iterator over owned packets, see [`PacketReader::owned_packets`]
pub struct OwnedPackets<'r> {
    reader: &'r mut PacketReader,
}

impl<'r> Iterator for OwnedPackets<'r> {
    type Item = Result<Packet<'static>, PcapError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader
            .next_packet()
            .map(|o| o.map(Packet::into_owned))
            .transpose()
    }
}
