use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::linktype::DataLinkType;
use crate::packet::TraceInterface;
use crate::PcapError;

use super::*;

/// An Interface Description Block (IDB) is the container for information
/// describing an interface on which packet data is captured.
#[derive(Debug)]
pub struct InterfaceDescriptionBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    pub linktype: DataLinkType,
    pub reserved: u16,
    pub snaplen: u32,
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
    pub if_tsresol: u8,
    pub if_tsoffset: i64,
}

impl<'a> InterfaceDescriptionBlock<'a> {
    /// Build the block describing `iface`, lengths are set when serializing
    ///
    /// `if_tsresol` is only written when it differs from the default (microseconds).
    pub fn from_interface(iface: &TraceInterface, if_tsresol: u8) -> InterfaceDescriptionBlock<'static> {
        let mut options = Vec::new();
        if let Some(name) = &iface.name {
            options.push(PcapNGOption::new(OptionCode::IfName, name.as_bytes()));
        }
        if let Some(description) = &iface.description {
            options.push(PcapNGOption::new(OptionCode::IfDescription, description.as_bytes()));
        }
        if let Some(filter) = &iface.filter {
            // filter type 0: libpcap filter string
            let mut value = vec![0];
            value.extend_from_slice(filter.as_bytes());
            options.push(PcapNGOption::new(OptionCode::IfFilter, value));
        }
        if let Some(os) = &iface.os {
            options.push(PcapNGOption::new(OptionCode::IfOs, os.as_bytes()));
        }
        if if_tsresol != 6 {
            options.push(PcapNGOption::new(OptionCode::IfTsresol, vec![if_tsresol]));
        }
        if iface.timestamp_offset != 0 {
            options.push(PcapNGOption::new(
                OptionCode::IfTsoffset,
                iface.timestamp_offset.to_le_bytes().to_vec(),
            ));
        }
        InterfaceDescriptionBlock {
            block_type: IDB_MAGIC,
            block_len1: 0,
            linktype: iface.data_link_type,
            reserved: 0,
            snaplen: iface.snaplen,
            options,
            block_len2: 0,
            if_tsresol,
            if_tsoffset: iface.timestamp_offset,
        }
    }

    /// Decode the interface time resolution, in units per second
    ///
    /// Return the resolution, or `None` if the resolution is invalid (for ex. greater than `2^64`)
    #[inline]
    pub fn ts_resolution(&self) -> Option<u64> {
        build_ts_resolution(self.if_tsresol)
    }

    /// Return the interface timestamp offset
    #[inline]
    pub fn ts_offset(&self) -> i64 {
        self.if_tsoffset
    }

    /// Return the `if_name` option value, if present
    pub fn if_name(&self) -> Option<String> {
        options_get_as_string(&self.options, OptionCode::IfName)
    }

    /// Return the `if_description` option value, if present
    pub fn if_description(&self) -> Option<String> {
        options_get_as_string(&self.options, OptionCode::IfDescription)
    }

    /// Return the `if_os` option value, if present
    pub fn if_os(&self) -> Option<String> {
        options_get_as_string(&self.options, OptionCode::IfOs)
    }

    /// Return the `if_filter` option value, if present
    ///
    /// The first byte of the option is the filter type and is not part of the expression.
    pub fn if_filter(&self) -> Option<String> {
        let opt = options_get(&self.options, OptionCode::IfFilter)?;
        let b = opt.as_bytes()?;
        if b.is_empty() {
            return None;
        }
        let expr = &b[1..];
        let end = expr.iter().rposition(|&c| c != 0).map_or(0, |p| p + 1);
        Some(String::from_utf8_lossy(&expr[..end]).into_owned())
    }

    /// Convert to the interface description exposed to users
    pub fn to_trace_interface(&self) -> Result<TraceInterface, PcapError> {
        let timestamp_resolution = self.ts_resolution().ok_or(PcapError::CorruptBlock {
            offset: 0,
            reason: "invalid if_tsresol",
        })?;
        Ok(TraceInterface {
            name: self.if_name(),
            description: self.if_description(),
            filter: self.if_filter(),
            os: self.if_os(),
            data_link_type: self.linktype,
            timestamp_resolution,
            timestamp_offset: self.if_tsoffset,
            snaplen: self.snaplen,
        })
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, InterfaceDescriptionBlock<'a>>
    for InterfaceDescriptionBlock<'a>
{
    const HDR_SZ: usize = 20;
    const MAGIC: u32 = IDB_MAGIC;

    fn inner_parse(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], InterfaceDescriptionBlock<'a>, PcapError> {
        // caller function already tested header type(magic) and length
        // read end of header
        let (i, linktype) = En::parse_u16(i)?;
        let (i, reserved) = En::parse_u16(i)?;
        let (i, snaplen) = En::parse_u32(i)?;
        // read options
        let (i, options) = opt_parse_options::<En, PcapError>(i, block_len1 as usize, 20)?;
        let (if_tsresol, if_tsoffset) = if_extract_tsoffset_and_tsresol(&options, En::BIG_ENDIAN);
        let block = InterfaceDescriptionBlock {
            block_type,
            block_len1,
            linktype: DataLinkType(linktype),
            reserved,
            snaplen,
            options,
            block_len2,
            if_tsresol,
            if_tsoffset,
        };
        Ok((i, block))
    }
}

/// Parse an Interface Packet Block (little-endian)
pub fn parse_interfacedescriptionblock_le(
    i: &[u8],
) -> IResult<&[u8], InterfaceDescriptionBlock, PcapError> {
    ng_block_parser::<InterfaceDescriptionBlock, PcapLE, _>()(i)
}

/// Parse an Interface Packet Block (big-endian)
pub fn parse_interfacedescriptionblock_be(
    i: &[u8],
) -> IResult<&[u8], InterfaceDescriptionBlock, PcapError> {
    ng_block_parser::<InterfaceDescriptionBlock, PcapBE, _>()(i)
}
