//! Packet writer
//!
//! [`Writer`] serializes packets to a legacy PCAP or a PCAPNG file. The format is given
//! explicitly, or inferred from the file extension.

use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::{ReaderOptions, WriterOptions};
use crate::magic::MagicNumber;
use crate::packet::{Packet, TraceInterface};
use crate::pcap::PcapWriter;
use crate::pcapng::PcapNGWriter;
use crate::reader::PacketReader;
use crate::PcapError;

/// Output format
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriterFormat {
    /// Infer from the file extension
    Auto,
    Pcap,
    Pcapng,
}

impl WriterFormat {
    /// Resolve `Auto` from the extension of `path` (case-insensitive)
    ///
    /// `pcap`, `cap` and `dmp` select PCAP, `pcapng` and `ntar` select PCAPNG.
    pub fn infer<P: AsRef<Path>>(self, path: P) -> Result<WriterFormat, PcapError> {
        if self != WriterFormat::Auto {
            return Ok(self);
        }
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pcap") | Some("cap") | Some("dmp") => Ok(WriterFormat::Pcap),
            Some("pcapng") | Some("ntar") => Ok(WriterFormat::Pcapng),
            _ => Err(PcapError::AmbiguousFormat(path.to_path_buf())),
        }
    }
}

enum FormatWriter {
    Pcap(PcapWriter<BufWriter<File>>),
    Pcapng(PcapNGWriter<BufWriter<File>>),
}

/// Writer to a PCAP or PCAPNG file
///
/// Output is buffered: it is written when the buffer fills, on [`Writer::flush`],
/// [`Writer::close`], or (ignoring errors) when the writer is dropped.
pub struct Writer {
    path: PathBuf,
    inner: FormatWriter,
}

impl Writer {
    /// Create `path`, or open it for appending if `append` is true and the file is not empty
    pub fn get_writer<P: AsRef<Path>>(path: P, append: bool, format: WriterFormat) -> Result<Writer, PcapError> {
        Self::with_options(path, append, format, &WriterOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(
        path: P,
        append: bool,
        format: WriterFormat,
        options: &WriterOptions,
    ) -> Result<Writer, PcapError> {
        let path = path.as_ref().to_path_buf();
        let format = format.infer(&path)?;
        let existing_len = match std::fs::metadata(&path) {
            Ok(m) if append => m.len(),
            _ => 0,
        };
        let inner = if existing_len > 0 {
            match format {
                WriterFormat::Pcapng => Self::append_pcapng(&path, existing_len, options)?,
                _ => Self::append_pcap(&path, existing_len)?,
            }
        } else {
            let out = BufWriter::new(File::create(&path)?);
            debug!("{:?}: new {:?} file", path, format);
            match format {
                WriterFormat::Pcapng => FormatWriter::Pcapng(PcapNGWriter::new(out, options.clone())?),
                _ => FormatWriter::Pcap(PcapWriter::new(out, options.snaplen)),
            }
        };
        Ok(Writer { path, inner })
    }

    fn append_pcap(path: &Path, file_len: u64) -> Result<FormatWriter, PcapError> {
        let mut reader = PacketReader::with_options(path, &ReaderOptions::default()).map_err(mismatch)?;
        if !reader.format().magic.is_legacy_pcap() {
            return Err(PcapError::FormatMismatch(format!(
                "cannot append pcap records to a {} file",
                reader.format().magic
            )));
        }
        // new records must start right after a complete one
        while reader.next_packet().map_err(mismatch)?.is_some() {}
        let header = match reader.legacy_header() {
            Some(h) => h.clone(),
            None => {
                return Err(PcapError::FormatMismatch(String::from(
                    "existing file has no pcap header",
                )))
            }
        };
        drop(reader);
        let out = BufWriter::new(OpenOptions::new().append(true).open(path)?);
        Ok(FormatWriter::Pcap(PcapWriter::appending(out, header, file_len)?))
    }

    fn append_pcapng(path: &Path, file_len: u64, options: &WriterOptions) -> Result<FormatWriter, PcapError> {
        let mut reader = PacketReader::with_options(path, &ReaderOptions::default()).map_err(mismatch)?;
        if reader.format().magic != MagicNumber::Pcapng {
            return Err(PcapError::FormatMismatch(format!(
                "cannot append pcapng blocks to a {} file",
                reader.format().magic
            )));
        }
        // walk the whole file to find the interfaces of the last section
        while reader.next_packet().map_err(mismatch)?.is_some() {}
        let interfaces: Vec<TraceInterface> = match reader.last_section() {
            Some((false, interfaces)) => interfaces.to_vec(),
            Some((true, _)) => {
                return Err(PcapError::FormatMismatch(String::from(
                    "cannot append to a big-endian pcapng section",
                )))
            }
            None => {
                return Err(PcapError::FormatMismatch(String::from(
                    "existing file has no section header",
                )))
            }
        };
        let out = BufWriter::new(OpenOptions::new().append(true).open(path)?);
        Ok(FormatWriter::Pcapng(PcapNGWriter::appending(
            out,
            interfaces,
            options.clone(),
            file_len,
        )))
    }

    /// Serialize one packet
    pub fn write(&mut self, packet: &Packet) -> Result<(), PcapError> {
        match &mut self.inner {
            FormatWriter::Pcap(w) => w.write_packet(packet),
            FormatWriter::Pcapng(w) => w.write_packet(packet),
        }
    }

    /// Declare a PCAPNG interface, returning its index
    ///
    /// Legacy PCAP files have no interface table: this fails with `FormatMismatch`.
    pub fn add_interface(&mut self, iface: &TraceInterface) -> Result<u32, PcapError> {
        match &mut self.inner {
            FormatWriter::Pcapng(w) => w.add_interface(iface),
            FormatWriter::Pcap(_) => Err(PcapError::FormatMismatch(String::from(
                "pcap files have no interface table",
            ))),
        }
    }

    /// Interfaces of the section being written (PCAPNG only)
    pub fn interfaces(&self) -> &[TraceInterface] {
        match &self.inner {
            FormatWriter::Pcapng(w) => w.interfaces(),
            FormatWriter::Pcap(_) => &[],
        }
    }

    /// Format being written, never `Auto`
    pub fn format(&self) -> WriterFormat {
        match self.inner {
            FormatWriter::Pcap(_) => WriterFormat::Pcap,
            FormatWriter::Pcapng(_) => WriterFormat::Pcapng,
        }
    }

    pub fn filepath(&self) -> &Path {
        &self.path
    }

    pub fn flush(&mut self) -> Result<(), PcapError> {
        match &mut self.inner {
            FormatWriter::Pcap(w) => w.flush(),
            FormatWriter::Pcapng(w) => w.flush(),
        }
    }

    /// Flush and close the file
    pub fn close(mut self) -> Result<(), PcapError> {
        self.flush()?;
        debug!("{:?}: closed", self.path);
        Ok(())
    }
}

/// Errors met while inspecting an existing file make it unsuitable for appending
fn mismatch(e: PcapError) -> PcapError {
    match e {
        PcapError::Io(e) => PcapError::Io(e),
        PcapError::FormatMismatch(s) => PcapError::FormatMismatch(s),
        e => PcapError::FormatMismatch(format!("existing file cannot be appended to: {}", e)),
    }
}
