use nom::bytes::streaming::take;
use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::PcapError;

use super::*;

/// The Simple Packet Block (SPB) is a lightweight container for storing
/// the packets coming from the network.
///
/// It has no interface id nor timestamp: packets belong to the first interface of the
/// section. The `data` field is stored with the padding.
#[derive(Debug)]
pub struct SimplePacketBlock<'a> {
    /// Block type (little endian)
    pub block_type: u32,
    pub block_len1: u32,
    /// Original packet length
    pub origlen: u32,
    pub data: &'a [u8],
    pub block_len2: u32,
}

impl<'a> SimplePacketBlock<'a> {
    /// Packet data, without padding
    ///
    /// The captured length is the smallest of the original length, the interface
    /// snaplen (if not zero) and the available data.
    pub fn packet_data(&self, snaplen: u32) -> &'a [u8] {
        let mut caplen = self.origlen as usize;
        if snaplen != 0 {
            caplen = caplen.min(snaplen as usize);
        }
        if caplen < self.data.len() {
            &self.data[..caplen]
        } else {
            self.data
        }
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, SimplePacketBlock<'a>>
    for SimplePacketBlock<'a>
{
    const HDR_SZ: usize = 16;
    const MAGIC: u32 = SPB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], SimplePacketBlock<'a>, PcapError> {
        // caller function already tested header type(magic) and length
        // read end of header
        let (i, origlen) = En::parse_u32(i)?;
        let (i, data) = take((block_len1 as usize) - 16)(i)?;
        let block = SimplePacketBlock {
            block_type,
            block_len1,
            origlen,
            data,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse a Simple Packet Block (little-endian)
///
/// *Note: this function does not remove padding in the `data` field.
/// Use `packet_data` to get field without padding.*
pub fn parse_simplepacketblock_le(i: &[u8]) -> IResult<&[u8], SimplePacketBlock, PcapError> {
    ng_block_parser::<SimplePacketBlock, PcapLE, _>()(i)
}

/// Parse a Simple Packet Block (big-endian)
///
/// *Note: this function does not remove padding*
pub fn parse_simplepacketblock_be(i: &[u8]) -> IResult<&[u8], SimplePacketBlock, PcapError> {
    ng_block_parser::<SimplePacketBlock, PcapBE, _>()(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_parse_spb() {
        let data = hex!(
            "
03 00 00 00 18 00 00 00 06 00 00 00 0A 0B 0C 0D
0E 0F 00 00 18 00 00 00"
        );
        let (rem, spb) = parse_simplepacketblock_le(&data).expect("SPB parsing failed");
        assert!(rem.is_empty());
        assert_eq!(spb.origlen, 6);
        assert_eq!(spb.data.len(), 8);
        assert_eq!(spb.packet_data(0), &[0x0au8, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f]);
        assert_eq!(spb.packet_data(4), &[0x0au8, 0x0b, 0x0c, 0x0d]);
    }
}
