use nom::bytes::streaming::take;
use nom::IResult;
use rusticata_macros::align32;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::PcapError;

use super::*;

/// The (obsolete) Packet Block, predecessor of the Enhanced Packet Block
///
/// Still written by some old tools. It differs from the EPB by a 16-bit interface
/// id followed by a drops counter.
#[derive(Debug)]
pub struct PacketBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    pub if_id: u16,
    pub drops_count: u16,
    pub ts_high: u32,
    pub ts_low: u32,
    pub caplen: u32,
    pub origlen: u32,
    /// Raw data from packet (with padding)
    pub data: &'a [u8],
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> PacketBlock<'a> {
    #[inline]
    pub fn timestamp(&self) -> u64 {
        build_ts(self.ts_high, self.ts_low)
    }

    /// Packet data, without padding
    pub fn packet_data(&self) -> &'a [u8] {
        let caplen = self.caplen as usize;
        if caplen < self.data.len() {
            &self.data[..caplen]
        } else {
            self.data
        }
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, PacketBlock<'a>> for PacketBlock<'a> {
    const HDR_SZ: usize = 32;
    const MAGIC: u32 = PB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], PacketBlock<'a>, PcapError> {
        let (i, if_id) = En::parse_u16(i)?;
        let (i, drops_count) = En::parse_u16(i)?;
        let (i, ts_high) = En::parse_u32(i)?;
        let (i, ts_low) = En::parse_u32(i)?;
        let (i, caplen) = En::parse_u32(i)?;
        let (i, origlen) = En::parse_u32(i)?;
        if caplen >= u32::MAX - 4 || align32!(caplen) as usize > i.len() {
            return corrupt("captured length exceeds block length");
        }
        let padded_length = align32!(caplen);
        let (i, data) = take(padded_length)(i)?;
        let current_offset = (32 + padded_length) as usize;
        let (i, options) = opt_parse_options::<En, PcapError>(i, block_len1 as usize, current_offset)?;
        let block = PacketBlock {
            block_type,
            block_len1,
            if_id,
            drops_count,
            ts_high,
            ts_low,
            caplen,
            origlen,
            data,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse a Packet Block (little-endian)
pub fn parse_packetblock_le(i: &[u8]) -> IResult<&[u8], PacketBlock, PcapError> {
    ng_block_parser::<PacketBlock, PcapLE, _>()(i)
}

/// Parse a Packet Block (big-endian)
pub fn parse_packetblock_be(i: &[u8]) -> IResult<&[u8], PacketBlock, PcapError> {
    ng_block_parser::<PacketBlock, PcapBE, _>()(i)
}
