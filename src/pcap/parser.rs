use nom::Err;

use crate::packet::{ParseStep, RawRecord, TraceInterface};
use crate::utils::array_ref4;
use crate::PcapError;

use super::*;

/// Record-level state machine for legacy PCAP streams
///
/// The file has a single synthetic interface built from the global header; packets
/// carry no interface index.
pub(crate) struct LegacyPcapParser {
    header: PcapHeader,
    parse: LegacyParseFn,
    interfaces: Vec<TraceInterface>,
    max_caplen: usize,
}

impl LegacyPcapParser {
    pub fn new(header: PcapHeader, max_caplen: usize) -> LegacyPcapParser {
        let parse: LegacyParseFn = match (header.is_modified_format(), header.is_bigendian()) {
            (false, false) => parse_pcap_frame,
            (false, true) => parse_pcap_frame_be,
            (true, false) => parse_pcap_frame_modified,
            (true, true) => parse_pcap_frame_modified_be,
        };
        let interfaces = vec![header.trace_interface()];
        LegacyPcapParser {
            header,
            parse,
            interfaces,
            max_caplen,
        }
    }

    pub fn header(&self) -> &PcapHeader {
        &self.header
    }

    pub fn interfaces(&self) -> &[TraceInterface] {
        &self.interfaces
    }

    /// Parse one record at the start of `i`
    ///
    /// Returns `Incomplete` if more data is needed. Error offsets are relative to `i`.
    pub fn step(&mut self, i: &[u8]) -> Result<ParseStep, Err<PcapError>> {
        if i.len() >= 12 {
            let raw = array_ref4(i, 8);
            let caplen = if self.header.is_bigendian() {
                u32::from_be_bytes(raw)
            } else {
                u32::from_le_bytes(raw)
            };
            if caplen as usize > self.max_caplen {
                return Err(Err::Error(PcapError::MalformedRecord {
                    offset: 0,
                    reason: "captured length exceeds buffer limit",
                }));
            }
        }
        let (rem, block) = (self.parse)(i)?;
        if block.caplen > block.origlen {
            return Err(Err::Error(PcapError::MalformedRecord {
                offset: 0,
                reason: "captured length exceeds original length",
            }));
        }
        let iface = &self.interfaces[0];
        // fractions of a second larger than the resolution are carried into the seconds
        let ts = u64::from(block.ts_sec) * iface.timestamp_resolution + u64::from(block.ts_frac);
        let (timestamp_seconds, timestamp_microseconds) = iface.normalize_timestamp(ts);
        let record = RawRecord {
            timestamp_seconds,
            timestamp_microseconds,
            capture_length: block.caplen,
            original_length: block.origlen,
            data_link_type: self.header.network,
            interface_index: None,
            data_offset: self.header.record_header_len(),
            consumed: i.len() - rem.len(),
        };
        Ok(ParseStep::Packet(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linktype::DataLinkType;
    use crate::pcap::frame::tests::FRAME_LE;
    use crate::pcap::header::tests::{PCAP_HDR, PCAP_HDR_NSEC};

    fn parser(hdr: &[u8]) -> LegacyPcapParser {
        let (_, header) = parse_pcap_header(hdr).expect("header parsing failed");
        LegacyPcapParser::new(header, 65536)
    }

    #[test]
    fn microsecond_record() {
        let mut p = parser(PCAP_HDR);
        assert_eq!(p.interfaces().len(), 1);
        let r = match p.step(FRAME_LE) {
            Ok(ParseStep::Packet(r)) => r,
            e => panic!("unexpected result {:?}", e),
        };
        assert_eq!(r.timestamp_seconds, 1_515_933_236);
        assert_eq!(r.timestamp_microseconds, 562_913);
        assert_eq!(r.data_link_type, DataLinkType::EN10MB);
        assert_eq!(r.interface_index, None);
        assert_eq!(r.data_range(), 16..20);
        assert_eq!(r.consumed, FRAME_LE.len());
    }

    #[test]
    fn nanosecond_record() {
        let mut p = parser(PCAP_HDR_NSEC);
        let mut frame = FRAME_LE.to_vec();
        // 500000000 ns
        frame[4..8].copy_from_slice(&500_000_000u32.to_le_bytes());
        let r = match p.step(&frame) {
            Ok(ParseStep::Packet(r)) => r,
            e => panic!("unexpected result {:?}", e),
        };
        assert_eq!(r.timestamp_microseconds, 500_000);
    }

    #[test]
    fn caplen_larger_than_origlen() {
        let mut p = parser(PCAP_HDR);
        let mut frame = FRAME_LE.to_vec();
        frame[12..16].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            p.step(&frame),
            Err(Err::Error(PcapError::MalformedRecord { .. }))
        ));
    }

    #[test]
    fn caplen_over_limit() {
        let (_, header) = parse_pcap_header(PCAP_HDR).unwrap();
        let mut p = LegacyPcapParser::new(header, 2);
        assert!(matches!(
            p.step(FRAME_LE),
            Err(Err::Error(PcapError::MalformedRecord { .. }))
        ));
    }
}
