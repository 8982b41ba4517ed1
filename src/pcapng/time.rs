use super::{OptionCode, PcapNGOption};

/// Compute the timestamp resolution, in units per second
///
/// Return the resolution, or `None` if the resolution is invalid (for ex. greater than `2^64`)
pub fn build_ts_resolution(ts_resol: u8) -> Option<u64> {
    let ts_mode = ts_resol & 0x80;
    let exponent = ts_resol & 0x7f;
    let unit = if ts_mode == 0 {
        // 10^if_tsresol
        // check that if_tsresol <= 19 (10^19 is the largest power of 10 to fit in a u64)
        if exponent > 19 {
            return None;
        }
        10u64.pow(exponent as u32)
    } else {
        // 2^if_tsresol
        if exponent > 63 {
            return None;
        }
        1u64 << exponent
    };
    Some(unit)
}

/// Find the `if_tsresol` value encoding a resolution, preferring powers of 10
pub fn ts_resolution_code(resolution: u64) -> Option<u8> {
    (0u8..=19)
        .find(|&n| 10u64.pow(n as u32) == resolution)
        .or_else(|| (1u8..=63).find(|&n| 1u64 << n == resolution).map(|n| 0x80 | n))
}

/// Merge the two halves of a PCAPNG timestamp
#[inline]
pub fn build_ts(ts_high: u32, ts_low: u32) -> u64 {
    ((ts_high as u64) << 32) | (ts_low as u64)
}

/// Split a raw timestamp into its high and low halves
#[inline]
pub fn split_ts(ts: u64) -> (u32, u32) {
    ((ts >> 32) as u32, ts as u32)
}

pub(crate) fn if_extract_tsoffset_and_tsresol(options: &[PcapNGOption], big_endian: bool) -> (u8, i64) {
    let mut if_tsresol: u8 = 6;
    let mut if_tsoffset: i64 = 0;
    for opt in options {
        match opt.code {
            OptionCode::IfTsresol => {
                if let Some(&b) = opt.as_bytes().and_then(|b| b.first()) {
                    if_tsresol = b;
                }
            }
            OptionCode::IfTsoffset => {
                if let Some(offset) = opt.as_i64(big_endian) {
                    if_tsoffset = offset;
                }
            }
            _ => (),
        }
    }
    (if_tsresol, if_tsoffset)
}
