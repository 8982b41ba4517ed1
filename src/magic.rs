//! Capture format detection
//!
//! All supported inputs start with a 32-bit magic number. Legacy PCAP magic numbers
//! are written in the byte order of the file, so each of them is checked both as
//! written and byte-swapped. PCAPNG starts with the (palindromic) Section Header
//! Block type, whose byte order is given by the byte-order magic 8 bytes later.
//! Zstandard frames are recognized regardless of their payload.

use std::convert::TryFrom;
use std::fmt;

use crate::error::PcapError;
use crate::pcapng::{BOM_MAGIC, SHB_MAGIC};

/// Number of bytes needed by [`detect_format`]
pub const MAGIC_LEN: usize = 4;

/// On-disk format variants, identified by their magic number
///
/// Values are the magic numbers as read in the byte order of the file itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum MagicNumber {
    /// Legacy PCAP, microsecond timestamps
    PcapMicroseconds = 0xa1b2_c3d4,
    /// Legacy PCAP, nanosecond timestamps
    PcapNanoseconds = 0xa1b2_3c4d,
    /// PCAPNG (Section Header Block type)
    Pcapng = 0x0a0d_0d0a,
    /// Zstandard frame
    Zstd = 0xfd2f_b528,
    /// Modified (Kuznetzov) PCAP, little-endian
    ModifiedPcap = 0xa1b2_cd34,
    /// Modified (Kuznetzov) PCAP, big-endian
    ModifiedPcapBe = 0x34cd_b2a1,
}

impl MagicNumber {
    #[inline]
    pub const fn value(self) -> u32 {
        self as u32
    }

    /// Returns true for any of the legacy PCAP variants
    pub fn is_legacy_pcap(self) -> bool {
        matches!(
            self,
            MagicNumber::PcapMicroseconds
                | MagicNumber::PcapNanoseconds
                | MagicNumber::ModifiedPcap
                | MagicNumber::ModifiedPcapBe
        )
    }

    pub fn is_modified_pcap(self) -> bool {
        matches!(self, MagicNumber::ModifiedPcap | MagicNumber::ModifiedPcapBe)
    }
}

impl TryFrom<u32> for MagicNumber {
    type Error = PcapError;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        match v {
            0xa1b2_c3d4 => Ok(MagicNumber::PcapMicroseconds),
            0xa1b2_3c4d => Ok(MagicNumber::PcapNanoseconds),
            0x0a0d_0d0a => Ok(MagicNumber::Pcapng),
            0xfd2f_b528 => Ok(MagicNumber::Zstd),
            0xa1b2_cd34 => Ok(MagicNumber::ModifiedPcap),
            0x34cd_b2a1 => Ok(MagicNumber::ModifiedPcapBe),
            _ => Err(PcapError::UnrecognizedFormat(v)),
        }
    }
}

impl fmt::Display for MagicNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            MagicNumber::PcapMicroseconds => "pcap",
            MagicNumber::PcapNanoseconds => "pcap (nanosecond)",
            MagicNumber::Pcapng => "pcapng",
            MagicNumber::Zstd => "zstd",
            MagicNumber::ModifiedPcap => "modified pcap",
            MagicNumber::ModifiedPcapBe => "modified pcap (big-endian)",
        };
        f.write_str(s)
    }
}

/// Result of format detection
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormatInfo {
    pub magic: MagicNumber,
    /// Byte order of multi-byte fields following the magic
    ///
    /// For PCAPNG this is only a hint taken from the first section; each section
    /// declares its own byte order. Always false for zstd.
    pub big_endian: bool,
}

impl FormatInfo {
    /// Returns true if legacy timestamps carry nanoseconds
    pub fn is_nanosecond_precision(&self) -> bool {
        self.magic == MagicNumber::PcapNanoseconds
    }

    /// Legacy record header length, in bytes
    pub fn record_header_len(&self) -> usize {
        if self.magic.is_modified_pcap() {
            24
        } else {
            16
        }
    }
}

/// Classify a stream from its first bytes
///
/// `i` must contain at least [`MAGIC_LEN`] bytes, otherwise `TruncatedHeader` is returned.
/// PCAPNG byte order is read from the byte-order magic if at least 12 bytes are available.
pub fn detect_format(i: &[u8]) -> Result<FormatInfo, PcapError> {
    if i.len() < MAGIC_LEN {
        return Err(PcapError::TruncatedHeader {
            needed: MAGIC_LEN,
            available: i.len(),
        });
    }
    let raw = [i[0], i[1], i[2], i[3]];
    let le = u32::from_le_bytes(raw);
    let be = u32::from_be_bytes(raw);
    let info = match le {
        0xa1b2_c3d4 | 0xa1b2_3c4d => FormatInfo {
            magic: MagicNumber::try_from(le)?,
            big_endian: false,
        },
        0xa1b2_cd34 => FormatInfo {
            magic: MagicNumber::ModifiedPcap,
            big_endian: false,
        },
        // written big-endian: the little-endian read is byte-swapped
        0xd4c3_b2a1 | 0x4d3c_b2a1 => FormatInfo {
            magic: MagicNumber::try_from(be)?,
            big_endian: true,
        },
        0x34cd_b2a1 => FormatInfo {
            magic: MagicNumber::ModifiedPcapBe,
            big_endian: true,
        },
        SHB_MAGIC => {
            let big_endian = i.len() >= 12 && u32::from_be_bytes([i[8], i[9], i[10], i[11]]) == BOM_MAGIC;
            FormatInfo {
                magic: MagicNumber::Pcapng,
                big_endian,
            }
        }
        0xfd2f_b528 => FormatInfo {
            magic: MagicNumber::Zstd,
            big_endian: false,
        },
        _ => return Err(PcapError::UnrecognizedFormat(le)),
    };
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn detect_all_magic_numbers() {
        let cases: &[(&[u8], MagicNumber, bool)] = &[
            (&hex!("d4 c3 b2 a1"), MagicNumber::PcapMicroseconds, false),
            (&hex!("a1 b2 c3 d4"), MagicNumber::PcapMicroseconds, true),
            (&hex!("4d 3c b2 a1"), MagicNumber::PcapNanoseconds, false),
            (&hex!("a1 b2 3c 4d"), MagicNumber::PcapNanoseconds, true),
            (&hex!("34 cd b2 a1"), MagicNumber::ModifiedPcap, false),
            (&hex!("a1 b2 cd 34"), MagicNumber::ModifiedPcapBe, true),
            (&hex!("0a 0d 0d 0a"), MagicNumber::Pcapng, false),
            (&hex!("28 b5 2f fd"), MagicNumber::Zstd, false),
        ];
        for (bytes, magic, big_endian) in cases {
            let info = detect_format(bytes).expect("detection failed");
            assert_eq!(info.magic, *magic, "bytes {:02x?}", bytes);
            assert_eq!(info.big_endian, *big_endian, "bytes {:02x?}", bytes);
        }
    }

    #[test]
    fn detect_pcapng_byte_order() {
        let le = hex!("0a 0d 0d 0a 1c 00 00 00 4d 3c 2b 1a");
        let be = hex!("0a 0d 0d 0a 00 00 00 1c 1a 2b 3c 4d");
        assert!(!detect_format(&le).unwrap().big_endian);
        assert!(detect_format(&be).unwrap().big_endian);
    }

    #[test]
    fn detect_truncated_and_unknown() {
        assert!(matches!(
            detect_format(&[0xd4, 0xc3]),
            Err(PcapError::TruncatedHeader {
                needed: 4,
                available: 2
            })
        ));
        assert!(matches!(
            detect_format(&hex!("de ad be ef")),
            Err(PcapError::UnrecognizedFormat(0xefbe_adde))
        ));
    }

    #[test]
    fn magic_values() {
        assert_eq!(MagicNumber::PcapMicroseconds.value(), 0xA1B2C3D4);
        assert_eq!(MagicNumber::PcapNanoseconds.value(), 0xA1B23C4D);
        assert_eq!(MagicNumber::Pcapng.value(), 0x0A0D0D0A);
        assert_eq!(MagicNumber::Zstd.value(), 0xFD2FB528);
        assert_eq!(MagicNumber::ModifiedPcap.value(), 0xA1B2CD34);
        assert!(MagicNumber::try_from(0x1234_5678).is_err());
    }
}
