use nom::bytes::streaming::take;
use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::utils::array_ref4;
use crate::PcapError;

/// Container for network data in legacy Pcap files
#[derive(Debug)]
pub struct LegacyPcapBlock<'a> {
    pub ts_sec: u32,
    /// Microseconds or nanoseconds, depending on the global header magic
    pub ts_frac: u32,
    pub caplen: u32,
    pub origlen: u32,
    pub data: &'a [u8],
}

pub(crate) type LegacyParseFn = fn(&[u8]) -> IResult<&[u8], LegacyPcapBlock, PcapError>;

fn parse_frame<En: PcapEndianness>(
    i: &[u8],
    header_len: usize,
) -> IResult<&[u8], LegacyPcapBlock, PcapError> {
    if i.len() < header_len {
        return Err(nom::Err::Incomplete(nom::Needed::new(header_len - i.len())));
    }
    let ts_sec = En::u32_from_bytes(array_ref4(i, 0));
    let ts_frac = En::u32_from_bytes(array_ref4(i, 4));
    let caplen = En::u32_from_bytes(array_ref4(i, 8));
    let origlen = En::u32_from_bytes(array_ref4(i, 12));
    // modified format: ifindex (4), protocol (2), pkt_type (1) and padding (1) are skipped
    let (i, data) = take(caplen as usize)(&i[header_len..])?;
    let block = LegacyPcapBlock {
        ts_sec,
        ts_frac,
        caplen,
        origlen,
        data,
    };
    Ok((i, block))
}

/// Read a PCAP record header and data
///
/// Each PCAP record starts with a small header, and is followed by packet data.
/// The packet data format depends on the LinkType.
pub fn parse_pcap_frame(i: &[u8]) -> IResult<&[u8], LegacyPcapBlock, PcapError> {
    parse_frame::<PcapLE>(i, 16)
}

/// Read a PCAP record header and data (big-endian)
pub fn parse_pcap_frame_be(i: &[u8]) -> IResult<&[u8], LegacyPcapBlock, PcapError> {
    parse_frame::<PcapBE>(i, 16)
}

/// Read a PCAP record header and data ("modified" pcap format)
pub fn parse_pcap_frame_modified(i: &[u8]) -> IResult<&[u8], LegacyPcapBlock, PcapError> {
    parse_frame::<PcapLE>(i, 24)
}

/// Read a PCAP record header and data ("modified" pcap format, big-endian)
pub fn parse_pcap_frame_modified_be(i: &[u8]) -> IResult<&[u8], LegacyPcapBlock, PcapError> {
    parse_frame::<PcapBE>(i, 24)
}
