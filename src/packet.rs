use std::fmt;

use crate::linktype::DataLinkType;
use crate::utils::Data;

/// Microseconds per second, the unit of [`Packet::timestamp_microseconds`]
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Nanoseconds per second
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A captured packet
///
/// Timestamps are always normalized to seconds and microseconds, whatever the
/// resolution of the source. `data` borrows from the reader when possible.
#[derive(Clone, Eq, PartialEq)]
pub struct Packet<'a> {
    /// Seconds since epoch
    pub timestamp_seconds: u64,
    /// Sub-second part, in microseconds
    pub timestamp_microseconds: u32,
    /// Number of bytes stored in the capture (`data.len()`)
    pub capture_length: u32,
    /// Number of bytes of the packet on the wire
    pub original_length: u32,
    pub data_link_type: DataLinkType,
    /// Index in the reader's interface table, `None` for legacy PCAP
    pub interface_index: Option<u32>,
    pub data: Data<'a>,
}

impl<'a> Packet<'a> {
    /// Build a packet from its payload; lengths are both set to `data.len()`
    pub fn new<D: Into<Data<'a>>>(
        timestamp_seconds: u64,
        timestamp_microseconds: u32,
        data_link_type: DataLinkType,
        data: D,
    ) -> Packet<'a> {
        let data = data.into();
        let len = data.len() as u32;
        Packet {
            timestamp_seconds,
            timestamp_microseconds,
            capture_length: len,
            original_length: len,
            data_link_type,
            interface_index: None,
            data,
        }
    }

    /// Set the length of the packet on the wire (for truncated captures)
    pub fn with_original_length(mut self, original_length: u32) -> Self {
        self.original_length = original_length;
        self
    }

    /// Set the interface index, used by PCAPNG writers
    pub fn with_interface(mut self, index: u32) -> Self {
        self.interface_index = Some(index);
        self
    }

    /// Returns true if fewer bytes were captured than were seen on the wire
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.capture_length < self.original_length
    }

    /// Packet bytes
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Copy the payload, so the packet can outlive its reader
    pub fn into_owned(self) -> Packet<'static> {
        Packet {
            timestamp_seconds: self.timestamp_seconds,
            timestamp_microseconds: self.timestamp_microseconds,
            capture_length: self.capture_length,
            original_length: self.original_length,
            data_link_type: self.data_link_type,
            interface_index: self.interface_index,
            data: self.data.into_owned(),
        }
    }
}

impl Default for Packet<'_> {
    fn default() -> Self {
        Packet::new(0, 0, DataLinkType::NULL, Data::default())
    }
}

impl fmt::Debug for Packet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Packet")
            .field("ts", &format_args!("{}.{:06}", self.timestamp_seconds, self.timestamp_microseconds))
            .field("caplen", &self.capture_length)
            .field("len", &self.original_length)
            .field("dlt", &self.data_link_type)
            .field("if", &self.interface_index)
            .finish()
    }
}

/// A capture interface, as declared by a PCAPNG Interface Description Block
///
/// Legacy PCAP files get one synthetic interface built from the global header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TraceInterface {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Capture filter expression
    pub filter: Option<String>,
    pub os: Option<String>,
    pub data_link_type: DataLinkType,
    /// Timestamp units per second (10^n or 2^n)
    pub timestamp_resolution: u64,
    /// Seconds added to every timestamp of this interface
    pub timestamp_offset: i64,
    /// Maximum number of captured bytes per packet, 0 for unlimited
    pub snaplen: u32,
}

impl TraceInterface {
    /// Interface with the given link type and microsecond resolution
    pub fn new(data_link_type: DataLinkType) -> TraceInterface {
        TraceInterface {
            name: None,
            description: None,
            filter: None,
            os: None,
            data_link_type,
            timestamp_resolution: MICROS_PER_SEC,
            timestamp_offset: 0,
            snaplen: 0,
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Convert a raw timestamp (in resolution units) to seconds and microseconds
    pub fn normalize_timestamp(&self, ts: u64) -> (u64, u32) {
        let res = self.timestamp_resolution.max(1);
        let secs = (ts / res).saturating_add_signed(self.timestamp_offset);
        let frac = ts % res;
        let micros = (u128::from(frac) * u128::from(MICROS_PER_SEC) / u128::from(res)) as u32;
        (secs, micros)
    }

    /// Convert seconds and microseconds to a raw timestamp, in resolution units
    pub fn raw_timestamp(&self, secs: u64, micros: u32) -> u64 {
        let res = u128::from(self.timestamp_resolution.max(1));
        let secs = secs.saturating_add_signed(self.timestamp_offset.saturating_neg());
        let ts = u128::from(secs) * res + u128::from(micros) * res / u128::from(MICROS_PER_SEC);
        ts as u64
    }
}

/// A packet located by a format parser, before its payload is borrowed from the source
///
/// The payload range is relative to the input given to the parser.
#[derive(Clone, Debug)]
pub(crate) struct RawRecord {
    pub timestamp_seconds: u64,
    pub timestamp_microseconds: u32,
    pub capture_length: u32,
    pub original_length: u32,
    pub data_link_type: DataLinkType,
    pub interface_index: Option<u32>,
    pub data_offset: usize,
    /// Bytes of input covered by the record or block
    pub consumed: usize,
}

impl RawRecord {
    #[inline]
    pub fn data_range(&self) -> std::ops::Range<usize> {
        self.data_offset..self.data_offset + self.capture_length as usize
    }
}

/// Outcome of one parser step
#[derive(Debug)]
pub(crate) enum ParseStep {
    Packet(RawRecord),
    /// A block without packet data was processed and can be consumed
    Skip(usize),
}

/// Free-form strings describing a capture (PCAPNG Section Header Block options)
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CaptureMetadata {
    pub comment: Option<String>,
    pub os: Option<String>,
    pub hardware: Option<String>,
    pub user_application: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_packet() {
        let p = Packet::default();
        assert_eq!(p.timestamp_seconds, 0);
        assert_eq!(p.capture_length, 0);
        assert_eq!(p.interface_index, None);
        assert!(p.data().is_empty());
    }

    #[test]
    fn nanosecond_interface_timestamps() {
        let mut iface = TraceInterface::new(DataLinkType::EN10MB);
        iface.timestamp_resolution = NANOS_PER_SEC;
        assert_eq!(iface.normalize_timestamp(1_500_000_000_500_000_000), (1_500_000_000, 500_000));
        assert_eq!(iface.raw_timestamp(1_500_000_000, 500_000), 1_500_000_000_500_000_000);
    }

    #[test]
    fn power_of_two_resolution() {
        let mut iface = TraceInterface::new(DataLinkType::EN10MB);
        iface.timestamp_resolution = 1 << 10;
        // 3 seconds and 512/1024
        assert_eq!(iface.normalize_timestamp(3 * 1024 + 512), (3, 500_000));
    }

    #[test]
    fn timestamp_offset() {
        let mut iface = TraceInterface::new(DataLinkType::EN10MB);
        iface.timestamp_offset = 100;
        assert_eq!(iface.normalize_timestamp(1_000_001), (101, 1));
        assert_eq!(iface.raw_timestamp(101, 1), 1_000_001);
    }
}
