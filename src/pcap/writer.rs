use std::convert::TryFrom;
use std::io::Write;

use log::debug;

use crate::packet::{Packet, MICROS_PER_SEC};
use crate::serialize::{legacy_record_to_vec, ToVec};
use crate::PcapError;

use super::*;

/// Legacy PCAP writer
///
/// A file has a single link type: the global header is written with the first packet,
/// using its link type. Later packets must use the same link type.
pub struct PcapWriter<W: Write> {
    writer: W,
    header: Option<PcapHeader>,
    snaplen: u32,
    written: u64,
}

impl<W: Write> PcapWriter<W> {
    /// Create a writer for a new (empty) file
    pub fn new(writer: W, snaplen: u32) -> PcapWriter<W> {
        PcapWriter {
            writer,
            header: None,
            snaplen,
            written: 0,
        }
    }

    /// Create a writer adding records after the existing `header`
    ///
    /// Records keep the byte order and timestamp precision of the file.
    pub fn appending(writer: W, header: PcapHeader, file_len: u64) -> Result<PcapWriter<W>, PcapError> {
        if header.is_modified_format() {
            return Err(PcapError::FormatMismatch(String::from(
                "cannot append to a modified pcap file",
            )));
        }
        debug!(
            "appending to pcap file ({}, big-endian: {}, link type {})",
            header.magic(),
            header.is_bigendian(),
            header.network
        );
        Ok(PcapWriter {
            writer,
            snaplen: header.snaplen,
            header: Some(header),
            written: file_len,
        })
    }

    /// Global header, once known
    pub fn header(&self) -> Option<&PcapHeader> {
        self.header.as_ref()
    }

    pub fn write_packet(&mut self, packet: &Packet) -> Result<(), PcapError> {
        let header = match self.header {
            Some(ref h) => h,
            None => {
                let mut h = PcapHeader::new(packet.data_link_type, self.snaplen);
                self.writer.write_all(&h.to_vec()?)?;
                self.written += h.size() as u64;
                debug!("pcap header written (link type {})", h.network);
                &*self.header.insert(h)
            }
        };
        if header.network != packet.data_link_type {
            return Err(PcapError::FormatMismatch(format!(
                "link type {} does not match the file link type {}",
                packet.data_link_type, header.network
            )));
        }
        let ts_sec = u32::try_from(packet.timestamp_seconds).map_err(|_| PcapError::MalformedRecord {
            offset: self.written,
            reason: "timestamp does not fit in 32 bits",
        })?;
        let micros_out_of_range = PcapError::MalformedRecord {
            offset: self.written,
            reason: "microseconds must be below one second",
        };
        if u64::from(packet.timestamp_microseconds) >= MICROS_PER_SEC {
            return Err(micros_out_of_range);
        }
        let ts_frac = if header.is_nanosecond_precision() {
            packet
                .timestamp_microseconds
                .checked_mul(1000)
                .ok_or(micros_out_of_range)?
        } else {
            packet.timestamp_microseconds
        };
        let data = packet.data();
        let caplen = data.len() as u32;
        let block = LegacyPcapBlock {
            ts_sec,
            ts_frac,
            caplen,
            origlen: packet.original_length.max(caplen),
            data,
        };
        let v = legacy_record_to_vec(&block, header.is_bigendian())?;
        self.writer.write_all(&v)?;
        self.written += v.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), PcapError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consume the writer, returning the underlying output
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linktype::DataLinkType;

    #[test]
    fn header_written_with_first_packet() {
        let mut w = PcapWriter::new(Vec::new(), 1500);
        assert!(w.header().is_none());
        let data = [1u8, 2, 3];
        let pkt = Packet::new(10, 20, DataLinkType::RAW, &data[..]).with_original_length(100);
        w.write_packet(&pkt).expect("write failed");
        let out = w.into_inner();
        assert_eq!(out.len(), 24 + 16 + 3);
        let (rem, hdr) = parse_pcap_header(&out).expect("header parsing failed");
        assert_eq!(hdr.network, DataLinkType::RAW);
        assert_eq!(hdr.snaplen, 1500);
        let (rem, block) = parse_pcap_frame(rem).expect("packet parsing failed");
        assert!(rem.is_empty());
        assert_eq!(block.ts_sec, 10);
        assert_eq!(block.ts_frac, 20);
        assert_eq!(block.origlen, 100);
        assert_eq!(block.data, &data);
    }

    #[test]
    fn link_type_mismatch() {
        let mut w = PcapWriter::new(Vec::new(), 1500);
        let data = [0u8; 4];
        w.write_packet(&Packet::new(0, 0, DataLinkType::EN10MB, &data[..]))
            .expect("write failed");
        assert!(matches!(
            w.write_packet(&Packet::new(0, 0, DataLinkType::RAW, &data[..])),
            Err(PcapError::FormatMismatch(_))
        ));
    }

    #[test]
    fn append_big_endian_nanoseconds() {
        let mut header = PcapHeader::new(DataLinkType::EN10MB, 65535);
        header.magic_number = 0x4d3c_b2a1;
        let mut w = PcapWriter::appending(Vec::new(), header, 24).expect("append failed");
        let pkt = Packet::new(1, 500_000, DataLinkType::EN10MB, &[0xaau8][..]);
        w.write_packet(&pkt).expect("write failed");
        let out = w.into_inner();
        let (rem, block) = parse_pcap_frame_be(&out).expect("packet parsing failed");
        assert!(rem.is_empty());
        assert_eq!(block.ts_frac, 500_000_000);
    }

    #[test]
    fn microseconds_out_of_range() {
        let mut header = PcapHeader::new(DataLinkType::EN10MB, 65535);
        header.magic_number = 0xa1b2_3c4d;
        let mut w = PcapWriter::appending(Vec::new(), header, 24).expect("append failed");
        // would overflow once scaled to nanoseconds
        let pkt = Packet::new(1, 5_000_000, DataLinkType::EN10MB, &[0xaau8][..]);
        assert!(matches!(
            w.write_packet(&pkt),
            Err(PcapError::MalformedRecord { offset: 24, .. })
        ));
        assert!(w.into_inner().is_empty());

        let mut w = PcapWriter::new(Vec::new(), 1500);
        w.write_packet(&Packet::new(1, 999_999, DataLinkType::EN10MB, &[1u8][..]))
            .expect("write failed");
        assert!(matches!(
            w.write_packet(&Packet::new(2, 1_000_000, DataLinkType::EN10MB, &[2u8][..])),
            Err(PcapError::MalformedRecord { offset: 41, .. })
        ));
        let out = w.into_inner();
        assert_eq!(out.len(), 24 + 16 + 1);
    }

    #[test]
    fn append_modified_rejected() {
        let mut header = PcapHeader::new(DataLinkType::EN10MB, 65535);
        header.magic_number = 0xa1b2_cd34;
        assert!(matches!(
            PcapWriter::appending(Vec::new(), header, 24),
            Err(PcapError::FormatMismatch(_))
        ));
    }
}
