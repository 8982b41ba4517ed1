use std::io::Write;

use cookie_factory::bytes::{le_i64, le_u16, le_u32};
use cookie_factory::combinator::slice;
use cookie_factory::multi::many_ref;
use cookie_factory::sequence::tuple;
use cookie_factory::{gen, GenError, SerializeFn};
use rusticata_macros::align32;

use crate::pcap::*;
use crate::pcapng::*;

/// Common trait for all serialization functions
pub trait ToVec {
    /// Serialize to bytes representation (little-endian, unless stated otherwise).
    /// Check values and fix all fields before serializing.
    fn to_vec(&mut self) -> Result<Vec<u8>, GenError> {
        self.fix();
        self.to_vec_raw()
    }

    /// Check and correct all fields: use magic, fix lengths fields and other values if possible.
    fn fix(&mut self) {}

    /// Serialize to bytes representation. Do not check values
    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError>;
}

fn u16_e<W: Write>(v: u16, big_endian: bool) -> impl SerializeFn<W> {
    slice(if big_endian { v.to_be_bytes() } else { v.to_le_bytes() })
}

fn u32_e<W: Write>(v: u32, big_endian: bool) -> impl SerializeFn<W> {
    slice(if big_endian { v.to_be_bytes() } else { v.to_le_bytes() })
}

fn i32_e<W: Write>(v: i32, big_endian: bool) -> impl SerializeFn<W> {
    slice(if big_endian { v.to_be_bytes() } else { v.to_le_bytes() })
}

impl ToVec for PcapHeader {
    /// Serialize in the byte order given by the magic number
    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(PCAP_HEADER_LEN);
        let be = self.is_bigendian();

        gen(
            tuple((
                // magic_number is stored as read in little-endian order
                le_u32(self.magic_number),
                u16_e(self.version_major, be),
                u16_e(self.version_minor, be),
                i32_e(self.thiszone, be),
                u32_e(self.sigfigs, be),
                u32_e(self.snaplen, be),
                u32_e(u32::from(self.network.0), be),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

/// Serialize a legacy record header and data
///
/// Modified-format records are not supported.
pub fn legacy_record_to_vec(block: &LegacyPcapBlock, big_endian: bool) -> Result<Vec<u8>, GenError> {
    let mut v = Vec::with_capacity(block.data.len() + 16);

    gen(
        tuple((
            u32_e(block.ts_sec, big_endian),
            u32_e(block.ts_frac, big_endian),
            u32_e(block.caplen, big_endian),
            u32_e(block.origlen, big_endian),
            slice(block.data),
        )),
        &mut v,
    )
    // pcap records have no alignment constraints
    .map(|res| res.0.to_vec())
}

impl<'a> ToVec for LegacyPcapBlock<'a> {
    fn fix(&mut self) {
        self.caplen = self.data.len() as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        legacy_record_to_vec(self, false)
    }
}

fn padding_for<'a, W: Write + 'a>(unaligned_length: u32) -> impl SerializeFn<W> + 'a {
    let length = align32!(unaligned_length) - unaligned_length;
    slice(if length > 0 {
        &[0, 0, 0, 0][..length as usize]
    } else {
        b""
    })
}

impl<'a> ToVec for PcapNGOption<'a> {
    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::new();
        gen(pcapngoption_le(self), &mut v).map(|res| res.0.to_vec())
    }
}

fn pcapngoption_le<'a, 'b: 'a, W: Write + 'a>(i: &'b PcapNGOption) -> impl SerializeFn<W> + 'a {
    tuple((
        le_u16(i.code.0),
        le_u16(i.len),
        slice(&i.value),
        padding_for(i.value.len() as u32),
    ))
}

fn options_length(options: &[PcapNGOption]) -> usize {
    options.iter().map(|o| align32!(4 + o.value.len())).sum()
}

fn fix_options(options: &mut Vec<PcapNGOption>) {
    options.retain(|e| e.code != OptionCode::EndOfOpt);
    if options.is_empty() {
        // No EndOfOpt is required if there are no options.
    } else {
        options.push(PcapNGOption::new(OptionCode::EndOfOpt, Vec::new()))
    }
}

impl<'a> ToVec for SectionHeaderBlock<'a> {
    /// Check and correct all fields: use magic, version and fix lengths fields
    fn fix(&mut self) {
        self.block_type = SHB_MAGIC;
        self.bom = BOM_MAGIC;
        self.major_version = 1;
        self.minor_version = 0;
        fix_options(&mut self.options);
        // fix length
        let length = (SHB_MIN_LEN + options_length(&self.options)) as u32;
        self.block_len1 = length;
        self.block_len2 = length;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(64);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                le_u32(self.bom),
                le_u16(self.major_version),
                le_u16(self.minor_version),
                le_i64(self.section_len),
                many_ref(&self.options, pcapngoption_le),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for InterfaceDescriptionBlock<'a> {
    /// Check and correct all fields: use magic and fix lengths fields
    fn fix(&mut self) {
        self.block_type = IDB_MAGIC;
        self.reserved = 0;
        fix_options(&mut self.options);
        // fix length
        let length = (20 + options_length(&self.options)) as u32;
        self.block_len1 = length;
        self.block_len2 = length;
    }

    /// Serialize to bytes representation. Do not check values
    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(64);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                le_u16(self.linktype.0),
                le_u16(self.reserved),
                le_u32(self.snaplen),
                many_ref(&self.options, pcapngoption_le),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for EnhancedPacketBlock<'a> {
    /// Check and correct all fields: use magic, captured length and fix lengths fields
    fn fix(&mut self) {
        self.block_type = EPB_MAGIC;
        self.caplen = self.data.len() as u32;
        fix_options(&mut self.options);
        // fix length
        let length = (32 + self.data.len() + options_length(&self.options)) as u32;
        self.block_len1 = align32!(length);
        self.block_len2 = self.block_len1;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.data.len() + 36);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len1),
                le_u32(self.if_id),
                le_u32(self.ts_high),
                le_u32(self.ts_low),
                le_u32(self.caplen),
                le_u32(self.origlen),
                slice(self.data),
                padding_for(self.data.len() as u32),
                many_ref(&self.options, pcapngoption_le),
                le_u32(self.block_len2),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}
