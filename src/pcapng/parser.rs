use log::{debug, trace};
use nom::Err;

use crate::packet::{CaptureMetadata, ParseStep, RawRecord, TraceInterface};
use crate::PcapError;

use super::*;

/// Byte order and interface range of the section being read
#[derive(Clone, Debug, Default)]
pub(crate) struct SectionContext {
    pub big_endian: bool,
    /// Index of the section's first interface in the reader table
    pub interface_offset: usize,
    pub interface_count: usize,
}

impl SectionContext {
    /// Map a section-local interface id to the reader table
    fn resolve(&self, if_id: u32) -> Result<usize, Err<PcapError>> {
        let if_id = if_id as usize;
        if if_id < self.interface_count {
            Ok(self.interface_offset + if_id)
        } else {
            corrupt("packet references an undeclared interface")
        }
    }
}

/// Block-level state machine for PCAPNG streams
///
/// Interfaces of all sections are appended to a single table, so interface indexes stay
/// valid for the whole file. Capture metadata comes from the first section.
#[derive(Debug, Default)]
pub(crate) struct PcapNGParser {
    section: SectionContext,
    sections: usize,
    interfaces: Vec<TraceInterface>,
    metadata: CaptureMetadata,
}

impl PcapNGParser {
    pub fn new() -> PcapNGParser {
        PcapNGParser::default()
    }

    pub fn interfaces(&self) -> &[TraceInterface] {
        &self.interfaces
    }

    /// Interfaces declared by the current (last seen) section
    pub fn section_interfaces(&self) -> &[TraceInterface] {
        &self.interfaces[self.section.interface_offset..]
    }

    pub fn section_big_endian(&self) -> bool {
        self.section.big_endian
    }

    /// Number of sections seen so far
    pub fn sections(&self) -> usize {
        self.sections
    }

    pub fn metadata(&self) -> &CaptureMetadata {
        &self.metadata
    }

    /// Parse one block at the start of `i`
    ///
    /// Returns `Incomplete` if more data is needed. Error offsets are relative to `i`.
    pub fn step(&mut self, i: &[u8]) -> Result<ParseStep, Err<PcapError>> {
        let (rem, block) = if self.sections == 0 {
            let (rem, shb) = parse_sectionheaderblock(i)?;
            (rem, Block::SectionHeader(shb))
        } else if self.section.big_endian {
            parse_block_be(i)?
        } else {
            parse_block_le(i)?
        };
        let consumed = i.len() - rem.len();
        match block {
            Block::SectionHeader(shb) => {
                if self.sections == 0 {
                    self.metadata = shb.metadata();
                }
                self.sections += 1;
                self.section = SectionContext {
                    big_endian: shb.big_endian(),
                    interface_offset: self.interfaces.len(),
                    interface_count: 0,
                };
                debug!(
                    "pcapng section {} (version {}.{}, big-endian: {})",
                    self.sections, shb.major_version, shb.minor_version, self.section.big_endian
                );
                Ok(ParseStep::Skip(consumed))
            }
            Block::InterfaceDescription(idb) => {
                let iface = idb.to_trace_interface().map_err(Err::Error)?;
                debug!(
                    "interface {}: {:?} ({}, {} units/s)",
                    self.interfaces.len(),
                    iface.name,
                    iface.data_link_type,
                    iface.timestamp_resolution
                );
                self.interfaces.push(iface);
                self.section.interface_count += 1;
                Ok(ParseStep::Skip(consumed))
            }
            Block::EnhancedPacket(epb) => {
                let index = self.section.resolve(epb.if_id)?;
                let data = epb.packet_data();
                let record = self.record(index, epb.timestamp(), epb.caplen, epb.origlen, i, data, consumed)?;
                Ok(ParseStep::Packet(record))
            }
            Block::Packet(pb) => {
                let index = self.section.resolve(u32::from(pb.if_id))?;
                let data = pb.packet_data();
                let record = self.record(index, pb.timestamp(), pb.caplen, pb.origlen, i, data, consumed)?;
                Ok(ParseStep::Packet(record))
            }
            Block::SimplePacket(spb) => {
                let index = self.section.resolve(0)?;
                let data = spb.packet_data(self.interfaces[index].snaplen);
                // no timestamp in simple packet blocks
                let record = self.record(index, 0, data.len() as u32, spb.origlen, i, data, consumed)?;
                Ok(ParseStep::Packet(record))
            }
            Block::Unknown(ub) => {
                trace!("skipping block type 0x{:08x} ({} bytes)", ub.block_type, ub.block_len1);
                Ok(ParseStep::Skip(consumed))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        index: usize,
        ts: u64,
        caplen: u32,
        origlen: u32,
        input: &[u8],
        data: &[u8],
        consumed: usize,
    ) -> Result<RawRecord, Err<PcapError>> {
        if caplen > origlen {
            return Err(Err::Error(PcapError::MalformedRecord {
                offset: 0,
                reason: "captured length exceeds original length",
            }));
        }
        let iface = &self.interfaces[index];
        let (timestamp_seconds, timestamp_microseconds) = iface.normalize_timestamp(ts);
        Ok(RawRecord {
            timestamp_seconds,
            timestamp_microseconds,
            capture_length: data.len() as u32,
            original_length: origlen,
            data_link_type: iface.data_link_type,
            interface_index: Some(index as u32),
            data_offset: data.as_ptr() as usize - input.as_ptr() as usize,
            consumed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcapng::enhanced_packet::tests::EPB_LE;
    use crate::pcapng::interface_description::tests::IDB_LE;
    use crate::pcapng::section_header::tests::SHB_LE;

    fn drive(parser: &mut PcapNGParser, mut i: &[u8]) -> Vec<RawRecord> {
        let mut records = Vec::new();
        while !i.is_empty() {
            match parser.step(i).expect("parser step failed") {
                ParseStep::Packet(r) => {
                    i = &i[r.consumed..];
                    records.push(r);
                }
                ParseStep::Skip(n) => i = &i[n..],
            }
        }
        records
    }

    #[test]
    fn parse_section() {
        let data = [SHB_LE, IDB_LE, EPB_LE].concat();
        let mut parser = PcapNGParser::new();
        let records = drive(&mut parser, &data);
        assert_eq!(parser.sections(), 1);
        assert_eq!(parser.interfaces().len(), 1);
        assert_eq!(parser.metadata().os.as_deref(), Some("Linux"));
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.interface_index, Some(0));
        assert_eq!(r.capture_length, 5);
        assert_eq!(r.original_length, 60);
        // nanosecond interface: 0x1_0000_0002 ns
        assert_eq!(r.timestamp_seconds, 4);
        assert_eq!(r.timestamp_microseconds, 294_967);
        // relative to the start of the block
        assert_eq!(r.data_range(), 28..33);
    }

    #[test]
    fn interfaces_across_sections() {
        let data = [SHB_LE, IDB_LE, SHB_LE, IDB_LE, EPB_LE].concat();
        let mut parser = PcapNGParser::new();
        let records = drive(&mut parser, &data);
        assert_eq!(parser.sections(), 2);
        assert_eq!(parser.interfaces().len(), 2);
        assert_eq!(parser.section_interfaces().len(), 1);
        // interface 0 of the second section
        assert_eq!(records[0].interface_index, Some(1));
    }

    #[test]
    fn undeclared_interface() {
        let data = [SHB_LE, EPB_LE].concat();
        let mut parser = PcapNGParser::new();
        assert!(matches!(parser.step(&data), Ok(ParseStep::Skip(_))));
        assert!(matches!(
            parser.step(&data[SHB_LE.len()..]),
            Err(Err::Error(PcapError::CorruptBlock { .. }))
        ));
    }

    #[test]
    fn first_block_must_be_section_header() {
        let mut parser = PcapNGParser::new();
        assert!(parser.step(IDB_LE).is_err());
    }
}
