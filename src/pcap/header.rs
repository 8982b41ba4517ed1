use nom::number::streaming::{be_i32, be_u16, be_u32, le_i32, le_u16, le_u32};
use nom::IResult;

use crate::linktype::DataLinkType;
use crate::magic::MagicNumber;
use crate::packet::{TraceInterface, MICROS_PER_SEC, NANOS_PER_SEC};
use crate::PcapError;

/// Size of the legacy global header, in bytes
pub const PCAP_HEADER_LEN: usize = 24;

/// PCAP global header
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PcapHeader {
    /// File format and byte ordering, as read in little-endian order. If equal to `0xa1b2c3d4`,
    /// `0xa1b23c4d` or `0xa1b2cd34` then the rest of the file is little-endian. If `0xd4c3b2a1`,
    /// `0x4d3cb2a1` or `0x34cdb2a1` (swapped), then all following fields are big-endian.
    pub magic_number: u32,
    /// Version major number (currently 2)
    pub version_major: u16,
    /// Version minor number (currently 4)
    pub version_minor: u16,
    /// The correction time in seconds between GMT (UTC) and the local timezone of the following packet header timestamps
    pub thiszone: i32,
    /// In theory, the accuracy of time stamps in the capture; in practice, all tools set it to 0
    pub sigfigs: u32,
    /// max len of captured packets, in octets
    pub snaplen: u32,
    /// Data link type
    pub network: DataLinkType,
}

impl PcapHeader {
    /// Little-endian header with microsecond timestamps
    pub fn new(network: DataLinkType, snaplen: u32) -> PcapHeader {
        PcapHeader {
            magic_number: MagicNumber::PcapMicroseconds.value(),
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen,
            network,
        }
    }

    pub const fn size(&self) -> usize {
        PCAP_HEADER_LEN
    }

    pub fn is_bigendian(&self) -> bool {
        (self.magic_number & 0xFFFF) == 0xb2a1 // works for all three variants
    }

    pub fn is_modified_format(&self) -> bool {
        self.magic_number == 0xa1b2_cd34 || self.magic_number == 0x34cd_b2a1
    }

    pub fn is_nanosecond_precision(&self) -> bool {
        self.magic_number == 0xa1b2_3c4d || self.magic_number == 0x4d3c_b2a1
    }

    /// Magic number variant, independent of byte order
    pub fn magic(&self) -> MagicNumber {
        if self.is_modified_format() {
            if self.is_bigendian() {
                MagicNumber::ModifiedPcapBe
            } else {
                MagicNumber::ModifiedPcap
            }
        } else if self.is_nanosecond_precision() {
            MagicNumber::PcapNanoseconds
        } else {
            MagicNumber::PcapMicroseconds
        }
    }

    /// Units per second of the record timestamp fraction
    pub fn ts_resolution(&self) -> u64 {
        if self.is_nanosecond_precision() {
            NANOS_PER_SEC
        } else {
            MICROS_PER_SEC
        }
    }

    /// Length of each record header following this global header
    pub fn record_header_len(&self) -> usize {
        if self.is_modified_format() {
            24
        } else {
            16
        }
    }

    /// The single interface described by this header
    pub fn trace_interface(&self) -> TraceInterface {
        let mut iface = TraceInterface::new(self.network);
        iface.timestamp_resolution = self.ts_resolution();
        iface.snaplen = self.snaplen;
        iface
    }
}

/// Read the PCAP global header
///
/// The global header contains the PCAP description and options
pub fn parse_pcap_header(i: &[u8]) -> IResult<&[u8], PcapHeader, PcapError> {
    let (i, magic_number) = le_u32(i)?;
    match magic_number {
        0xa1b2_c3d4 | 0xa1b2_3c4d | 0xa1b2_cd34 => {
            let (i, version_major) = le_u16(i)?;
            let (i, version_minor) = le_u16(i)?;
            let (i, thiszone) = le_i32(i)?;
            let (i, sigfigs) = le_u32(i)?;
            let (i, snaplen) = le_u32(i)?;
            let (i, network) = le_u32(i)?;
            let header = PcapHeader {
                magic_number,
                version_major,
                version_minor,
                thiszone,
                sigfigs,
                snaplen,
                network: DataLinkType::from_network(network),
            };
            Ok((i, header))
        }
        0xd4c3_b2a1 | 0x4d3c_b2a1 | 0x34cd_b2a1 => {
            let (i, version_major) = be_u16(i)?;
            let (i, version_minor) = be_u16(i)?;
            let (i, thiszone) = be_i32(i)?;
            let (i, sigfigs) = be_u32(i)?;
            let (i, snaplen) = be_u32(i)?;
            let (i, network) = be_u32(i)?;
            let header = PcapHeader {
                magic_number,
                version_major,
                version_minor,
                thiszone,
                sigfigs,
                snaplen,
                network: DataLinkType::from_network(network),
            };
            Ok((i, header))
        }
        _ => Err(nom::Err::Error(PcapError::UnrecognizedFormat(magic_number))),
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use hex_literal::hex;

    // ntp.pcap header
    pub const PCAP_HDR: &[u8] = &hex!(
        "
D4 C3 B2 A1 02 00 04 00 00 00 00 00 00 00 00 00
00 00 04 00 01 00 00 00"
    );

    // pcap header with nanosecond-precision timestamping
    pub const PCAP_HDR_NSEC: &[u8] = &hex!(
        "
4D 3C B2 A1 02 00 04 00 00 00 00 00 00 00 00 00
00 00 04 00 01 00 00 00"
    );

    // big-endian header, raw IP
    pub const PCAP_HDR_BE: &[u8] = &hex!(
        "
A1 B2 C3 D4 00 02 00 04 00 00 00 00 00 00 00 00
00 00 FF FF 00 00 00 65"
    );

    #[test]
    fn test_parse_pcap_header() {
        let (rem, hdr) = parse_pcap_header(PCAP_HDR).expect("header parsing failed");
        assert!(rem.is_empty());
        assert_eq!(hdr.magic_number, 0xa1b2_c3d4);
        assert_eq!(hdr.version_major, 2);
        assert_eq!(hdr.version_minor, 4);
        assert_eq!(hdr.snaplen, 262_144);
        assert_eq!(hdr.network, DataLinkType::EN10MB);
        assert!(!hdr.is_nanosecond_precision());
        assert!(!hdr.is_bigendian());
    }

    #[test]
    fn test_parse_nanosecond_precision_pcap_header() {
        let (rem, hdr) = parse_pcap_header(PCAP_HDR_NSEC).expect("header parsing failed");
        assert!(rem.is_empty());
        assert_eq!(hdr.magic_number, 0xa1b2_3c4d);
        assert!(hdr.is_nanosecond_precision());
        assert_eq!(hdr.ts_resolution(), NANOS_PER_SEC);
        assert_eq!(hdr.magic(), MagicNumber::PcapNanoseconds);
    }

    #[test]
    fn test_parse_bigendian_pcap_header() {
        let (_, hdr) = parse_pcap_header(PCAP_HDR_BE).expect("header parsing failed");
        assert!(hdr.is_bigendian());
        assert_eq!(hdr.version_major, 2);
        assert_eq!(hdr.snaplen, 65535);
        assert_eq!(hdr.network, DataLinkType::RAW);
        assert_eq!(hdr.trace_interface().data_link_type, DataLinkType::RAW);
    }

    #[test]
    fn test_parse_incomplete_header() {
        assert!(matches!(
            parse_pcap_header(&PCAP_HDR[..20]),
            Err(nom::Err::Incomplete(_))
        ));
    }
}
