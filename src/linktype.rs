use rusticata_macros::newtype_enum;

/// Data link type
///
/// The link-layer header type specifies the type of headers at the beginning
/// of the packet. Legacy PCAP stores it in the low 16 bits of the global header
/// `network` field, PCAPNG stores it in each Interface Description Block.
///
/// See <http://www.tcpdump.org/linktypes.html>
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct DataLinkType(pub u16);

newtype_enum! {
impl display DataLinkType {
    NULL = 0,
    EN10MB = 1,

    IEEE802_5 = 6,
    PPP = 9,
    FDDI = 10,

    RAW = 101,
    IEEE802_11 = 105,

    LOOP = 108,
    LINUX_SLL = 113,

    IEEE802_11_RADIOTAP = 127,

    // Raw IPv4; the packet begins with an IPv4 header.
    IPV4 = 228,
    // Raw IPv6; the packet begins with an IPv6 header.
    IPV6 = 229,

    NFLOG = 239,

    LINUX_SLL2 = 276,
}
}

impl DataLinkType {
    /// Extract the link type from a legacy PCAP `network` field
    ///
    /// The upper 16 bits may carry FCS information and are ignored.
    #[inline]
    pub fn from_network(network: u32) -> DataLinkType {
        DataLinkType((network & 0xffff) as u16)
    }
}

impl From<u16> for DataLinkType {
    fn from(v: u16) -> Self {
        DataLinkType(v)
    }
}
