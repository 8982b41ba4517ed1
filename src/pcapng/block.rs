use nom::bytes::streaming::take;
use nom::combinator::map;
use nom::number::streaming::le_u32;
use nom::{Err, IResult};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::PcapError;

use super::*;

/// A block from a PcapNG file
#[derive(Debug)]
pub enum Block<'a> {
    SectionHeader(SectionHeaderBlock<'a>),
    InterfaceDescription(InterfaceDescriptionBlock<'a>),
    EnhancedPacket(EnhancedPacketBlock<'a>),
    SimplePacket(SimplePacketBlock<'a>),
    Packet(PacketBlock<'a>),
    Unknown(UnknownBlock<'a>),
}

impl<'a> Block<'a> {
    /// Returns true if blocks contains a network packet
    pub fn is_data_block(&self) -> bool {
        matches!(
            self,
            &Block::EnhancedPacket(_) | &Block::SimplePacket(_) | &Block::Packet(_)
        )
    }

    /// Return the normalized magic number of the block
    pub fn magic(&self) -> u32 {
        match self {
            Block::SectionHeader(_) => SHB_MAGIC,
            Block::InterfaceDescription(_) => IDB_MAGIC,
            Block::EnhancedPacket(_) => EPB_MAGIC,
            Block::SimplePacket(_) => SPB_MAGIC,
            Block::Packet(_) => PB_MAGIC,
            Block::Unknown(ub) => ub.block_type,
        }
    }
}

/// Parse any block, as little-endian
///
/// To find which endianess to use, read the section header
/// using `parse_sectionheaderblock`
pub fn parse_block_le(i: &[u8]) -> IResult<&[u8], Block, PcapError> {
    parse_block::<PcapLE>(i)
}

/// Parse any block, as big-endian
///
/// To find which endianess to use, read the section header
/// using `parse_sectionheaderblock`
pub fn parse_block_be(i: &[u8]) -> IResult<&[u8], Block, PcapError> {
    parse_block::<PcapBE>(i)
}

fn parse_block<En: PcapEndianness>(i: &[u8]) -> IResult<&[u8], Block, PcapError> {
    let (_, id) = le_u32(i)?;
    match En::native_u32(id) {
        // the section header magic is a palindrome
        _ if id == SHB_MAGIC => map(parse_sectionheaderblock, Block::SectionHeader)(i),
        IDB_MAGIC => map(
            ng_block_parser::<InterfaceDescriptionBlock, En, _>(),
            Block::InterfaceDescription,
        )(i),
        EPB_MAGIC => map(
            ng_block_parser::<EnhancedPacketBlock, En, _>(),
            Block::EnhancedPacket,
        )(i),
        SPB_MAGIC => map(
            ng_block_parser::<SimplePacketBlock, En, _>(),
            Block::SimplePacket,
        )(i),
        PB_MAGIC => map(ng_block_parser::<PacketBlock, En, _>(), Block::Packet)(i),
        _ => map(ng_block_parser::<UnknownBlock, En, _>(), Block::Unknown)(i),
    }
}

pub(crate) trait PcapNGBlockParser<'a, En: PcapEndianness, O: 'a> {
    /// Minimum header size, in bytes
    const HDR_SZ: usize;
    /// Little-endian magic number for this block type
    const MAGIC: u32;

    // caller function must have tested header type(magic) and lengths
    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], O, PcapError>;
}

#[inline]
pub(crate) fn corrupt<T>(reason: &'static str) -> Result<T, Err<PcapError>> {
    Err(Err::Error(PcapError::CorruptBlock { offset: 0, reason }))
}

/// Create a block parser function, given the parameters (block object and endianness)
///
/// The generic block layout is checked here: both length fields must match, be a multiple
/// of 4 and cover at least the block header. Errors carry offsets relative to the block.
pub(crate) fn ng_block_parser<'a, P, En, O>() -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], O, PcapError>
where
    P: PcapNGBlockParser<'a, En, O>,
    En: PcapEndianness,
    O: 'a,
{
    move |i: &'a [u8]| {
        // read generic block layout
        //
        if i.len() < 12 {
            return Err(Err::Incomplete(nom::Needed::new(12 - i.len())));
        }
        let (i, block_type) = le_u32(i)?;
        let (i, block_len1) = En::parse_u32(i)?;
        if block_len1 < P::HDR_SZ as u32 {
            return corrupt("block length smaller than block header");
        }
        if block_len1 % 4 != 0 {
            return corrupt("block length is not a multiple of 4");
        }
        if P::MAGIC != 0 && En::native_u32(block_type) != P::MAGIC {
            return corrupt("unexpected block type");
        }
        // 12 is block_type (4) + block_len1 (4) + block_len2 (4)
        let (i, block_content) = take(block_len1 - 12)(i)?;
        let (i, block_len2) = En::parse_u32(i)?;
        if block_len2 != block_len1 {
            return corrupt("trailing block length does not match");
        }
        // call block content parsing function
        let (_, b) = P::inner_parse(block_type, block_len1, block_content, block_len2).map_err(
            |e| match e {
                // the content is complete: missing bytes mean inconsistent fields
                Err::Incomplete(_) => Err::Error(PcapError::CorruptBlock {
                    offset: 0,
                    reason: "block fields overflow block length",
                }),
                e => e,
            },
        )?;
        // return the remaining bytes from the container, not content
        Ok((i, b))
    }
}
