use std::borrow::Cow;
use std::convert::TryFrom;

use nom::combinator::{complete, map_parser};
use nom::multi::many0;
use nom::IResult;
use nom::{bytes::streaming::take, error::ParseError};
use rusticata_macros::{align32, newtype_enum};

use crate::endianness::PcapEndianness;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct OptionCode(pub u16);

newtype_enum! {
impl debug OptionCode {
    EndOfOpt = 0,
    Comment = 1,
    ShbHardware = 2,
    ShbOs = 3,
    ShbUserAppl = 4,
    IfTsresol = 9,
    IfFilter = 11,
    IfOs = 12,
    IfTsoffset = 14,
}
}

// IDB codes sharing a value with SHB codes stay out of the debug table
#[allow(non_upper_case_globals)]
impl OptionCode {
    pub const IfName: OptionCode = OptionCode(2);
    pub const IfDescription: OptionCode = OptionCode(3);
}

#[derive(Clone, Debug)]
pub struct PcapNGOption<'a> {
    pub code: OptionCode,
    pub len: u16,
    pub value: Cow<'a, [u8]>,
}

impl<'a> PcapNGOption<'a> {
    /// Build an owned option; `len` is the value length, padding is added when serializing
    pub fn new<V: Into<Vec<u8>>>(code: OptionCode, value: V) -> PcapNGOption<'static> {
        let value = value.into();
        PcapNGOption {
            code,
            len: value.len() as u16,
            value: Cow::Owned(value),
        }
    }

    /// Return a reference to the option value, as raw bytes (not related to the `len` field)
    #[inline]
    pub fn value(&self) -> &[u8] {
        self.value.as_ref()
    }

    /// Return a reference to the option value, using the `len` field to limit it, or None if length is invalid
    pub fn as_bytes(&self) -> Option<&[u8]> {
        let len = usize::from(self.len);
        if len <= self.value.len() {
            Some(&self.value[..len])
        } else {
            None
        }
    }

    /// Return the option value as a string
    ///
    /// Invalid UTF-8 sequences are replaced, and trailing NUL bytes are removed.
    pub fn as_string(&self) -> Option<String> {
        let b = self.as_bytes()?;
        let end = b.iter().rposition(|&c| c != 0).map_or(0, |p| p + 1);
        Some(String::from_utf8_lossy(&b[..end]).into_owned())
    }

    /// Return the option value interpreted as i64 in the section byte order, or None
    ///
    /// Option data length and declared must be exactly 8 bytes
    pub fn as_i64(&self, big_endian: bool) -> Option<i64> {
        if self.len == 8 && self.value.len() == 8 {
            <[u8; 8]>::try_from(self.value()).ok().map(|b| {
                if big_endian {
                    i64::from_be_bytes(b)
                } else {
                    i64::from_le_bytes(b)
                }
            })
        } else {
            None
        }
    }
}

/// Return the first option with the given code
pub fn options_get<'a, 'o>(
    options: &'o [PcapNGOption<'a>],
    code: OptionCode,
) -> Option<&'o PcapNGOption<'a>> {
    options.iter().find(|o| o.code == code)
}

/// Return the first option with the given code, as a string
pub fn options_get_as_string(options: &[PcapNGOption], code: OptionCode) -> Option<String> {
    options_get(options, code).and_then(PcapNGOption::as_string)
}

pub(crate) fn parse_option<'i, En: PcapEndianness, E: ParseError<&'i [u8]>>(
    i: &'i [u8],
) -> IResult<&'i [u8], PcapNGOption, E> {
    let (i, code) = En::parse_u16(i)?;
    let (i, len) = En::parse_u16(i)?;
    let (i, value) = take(align32!(len as u32))(i)?;
    let option = PcapNGOption {
        code: OptionCode(code),
        len,
        value: Cow::Borrowed(value),
    };
    Ok((i, option))
}

/// Parse the options of a block, stopping at `opt_endofopt` or at the first malformed option
pub(crate) fn opt_parse_options<'i, En: PcapEndianness, E: ParseError<&'i [u8]>>(
    i: &'i [u8],
    len: usize,
    opt_offset: usize,
) -> IResult<&'i [u8], Vec<PcapNGOption>, E> {
    if len > opt_offset {
        let (i, mut options) = map_parser(
            take(len - opt_offset),
            many0(complete(parse_option::<En, E>)),
        )(i)?;
        if let Some(end) = options.iter().position(|o| o.code == OptionCode::EndOfOpt) {
            options.truncate(end);
        }
        Ok((i, options))
    } else {
        Ok((i, Vec::new()))
    }
}
