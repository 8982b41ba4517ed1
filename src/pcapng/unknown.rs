use nom::IResult;

use crate::endianness::PcapEndianness;
use crate::PcapError;

use super::*;

/// Any block that does not carry packets or interfaces (statistics, name resolution,
/// custom blocks, ...). Only its framing is checked.
#[derive(Debug)]
pub struct UnknownBlock<'a> {
    /// Block type, in the section byte order
    pub block_type: u32,
    pub block_len1: u32,
    pub data: &'a [u8],
    pub block_len2: u32,
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, UnknownBlock<'a>> for UnknownBlock<'a> {
    const HDR_SZ: usize = 12;
    const MAGIC: u32 = 0;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], UnknownBlock<'a>, PcapError> {
        let block = UnknownBlock {
            block_type: En::native_u32(block_type),
            block_len1,
            data: i,
            block_len2,
        };
        Ok((i, block))
    }
}
