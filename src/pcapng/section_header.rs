use nom::number::streaming::le_u32;
use nom::{Err, IResult};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::packet::CaptureMetadata;
use crate::utils::array_ref4;
use crate::PcapError;

use super::*;

/// Smallest possible Section Header Block (no options)
pub const SHB_MIN_LEN: usize = 28;

/// The Section Header Block (SHB) identifies the
/// beginning of a section of the capture capture file.
///
/// The
/// Section Header Block does not contain data but it rather identifies a
/// list of blocks (interfaces, packets) that are logically correlated.
#[derive(Debug)]
pub struct SectionHeaderBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    /// Byte-order magic, as read in little-endian order
    pub bom: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub section_len: i64,
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> SectionHeaderBlock<'a> {
    /// Little-endian section header with the given options, lengths are set when serializing
    pub fn new(options: Vec<PcapNGOption<'a>>) -> SectionHeaderBlock<'a> {
        SectionHeaderBlock {
            block_type: SHB_MAGIC,
            block_len1: 0,
            bom: BOM_MAGIC,
            major_version: 1,
            minor_version: 0,
            section_len: -1,
            options,
            block_len2: 0,
        }
    }

    pub fn big_endian(&self) -> bool {
        self.bom != BOM_MAGIC
    }

    /// Return the `opt_comment`, `shb_os`, `shb_hardware` and `shb_userappl` options
    pub fn metadata(&self) -> CaptureMetadata {
        CaptureMetadata {
            comment: options_get_as_string(&self.options, OptionCode::Comment),
            os: options_get_as_string(&self.options, OptionCode::ShbOs),
            hardware: options_get_as_string(&self.options, OptionCode::ShbHardware),
            user_application: options_get_as_string(&self.options, OptionCode::ShbUserAppl),
        }
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, SectionHeaderBlock<'a>>
    for SectionHeaderBlock<'a>
{
    const HDR_SZ: usize = SHB_MIN_LEN;
    const MAGIC: u32 = SHB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], SectionHeaderBlock<'a>, PcapError> {
        // caller function already tested header type(magic) and length
        // read end of header
        let (i, bom) = le_u32(i)?;
        let (i, major_version) = En::parse_u16(i)?;
        let (i, minor_version) = En::parse_u16(i)?;
        let (i, section_len) = En::parse_i64(i)?;
        let (i, options) = opt_parse_options::<En, PcapError>(i, block_len1 as usize, 28)?;
        let block = SectionHeaderBlock {
            block_type,
            block_len1,
            bom,
            major_version,
            minor_version,
            section_len,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse a Section Header Block (little endian)
pub fn parse_sectionheaderblock_le(i: &[u8]) -> IResult<&[u8], SectionHeaderBlock, PcapError> {
    ng_block_parser::<SectionHeaderBlock, PcapLE, _>()(i)
}

/// Parse a Section Header Block (big endian)
pub fn parse_sectionheaderblock_be(i: &[u8]) -> IResult<&[u8], SectionHeaderBlock, PcapError> {
    ng_block_parser::<SectionHeaderBlock, PcapBE, _>()(i)
}

/// Parse a SectionHeaderBlock (little or big endian)
pub fn parse_sectionheaderblock(i: &[u8]) -> IResult<&[u8], SectionHeaderBlock, PcapError> {
    if i.len() < 12 {
        return Err(Err::Incomplete(nom::Needed::new(12 - i.len())));
    }
    let bom = u32::from_le_bytes(array_ref4(i, 8));
    if bom == BOM_MAGIC {
        parse_sectionheaderblock_le(i)
    } else if bom == BOM_MAGIC.swap_bytes() {
        parse_sectionheaderblock_be(i)
    } else {
        Err(Err::Error(PcapError::CorruptBlock {
            offset: 8,
            reason: "invalid byte-order magic",
        }))
    }
}
