use std::fs;
use std::path::{Path, PathBuf};

use fpcap::pcapng::*;
use fpcap::*;
use hex_literal::hex;

const SHB_BE: &[u8] = &hex!(
    "
0A 0D 0D 0A 00 00 00 1C 1A 2B 3C 4D 00 01 00 00
FF FF FF FF FF FF FF FF 00 00 00 1C"
);

const IDB_BE: &[u8] = &hex!(
    "
00 00 00 01 00 00 00 14 00 01 00 00 00 00 FF FF
00 00 00 14"
);

// interface 0, 1.000001 s, 3 bytes
const EPB_BE: &[u8] = &hex!(
    "
00 00 00 06 00 00 00 24 00 00 00 00 00 00 00 00
00 0F 42 41 00 00 00 03 00 00 00 03 AA BB CC 00
00 00 00 24"
);

// origlen 3, data 0A 0B 0C
const SPB_LE: &[u8] = &hex!(
    "
03 00 00 00 14 00 00 00 03 00 00 00 0A 0B 0C 00
14 00 00 00"
);

// unknown block type, 4 bytes of content
const CUSTOM_LE: &[u8] = &hex!(
    "
AD 0B 00 00 10 00 00 00 01 02 03 04 10 00 00 00"
);

const TS_BASE: u64 = 1_700_000_000;

fn shb(options: Vec<PcapNGOption<'static>>) -> Vec<u8> {
    SectionHeaderBlock::new(options).to_vec().expect("SHB serialization")
}

fn idb(iface: &TraceInterface, if_tsresol: u8) -> Vec<u8> {
    InterfaceDescriptionBlock::from_interface(iface, if_tsresol)
        .to_vec()
        .expect("IDB serialization")
}

fn epb(if_id: u32, ts: u64, data: &[u8], origlen: u32) -> Vec<u8> {
    EnhancedPacketBlock::new(if_id, ts, origlen, data)
        .to_vec()
        .expect("EPB serialization")
}

fn micros(sec: u64, usec: u64) -> u64 {
    sec * MICROS_PER_SEC + usec
}

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("cannot write fixture");
    path
}

fn read_all(reader: &mut PacketReader) -> Vec<Packet<'static>> {
    reader
        .owned_packets()
        .collect::<Result<Vec<_>, _>>()
        .expect("error while reading")
}

fn sample_file() -> Vec<u8> {
    let mut content = shb(vec![
        PcapNGOption::new(OptionCode::Comment, "test capture"),
        PcapNGOption::new(OptionCode::ShbHardware, "x86_64"),
        PcapNGOption::new(OptionCode::ShbOs, "Linux 6.1"),
        PcapNGOption::new(OptionCode::ShbUserAppl, "dumpcap"),
    ]);
    let mut iface = TraceInterface::new(DataLinkType::EN10MB).with_name("eth0");
    iface.description = Some(String::from("uplink"));
    iface.filter = Some(String::from("udp port 53"));
    iface.os = Some(String::from("Linux"));
    content.extend(idb(&iface, 6));
    content.extend(epb(0, micros(TS_BASE, 123_456), &[1, 2, 3, 4, 5], 60));
    content.extend_from_slice(CUSTOM_LE);
    content.extend(epb(0, micros(TS_BASE + 1, 0), &[0x55; 64], 64));
    content.extend_from_slice(SPB_LE);
    content
}

#[test]
fn test_pcapng_reader() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "sample.pcapng", &sample_file());
    let mut reader = PacketReader::new(&path, true).expect("PacketReader");
    assert_eq!(reader.format().magic, MagicNumber::Pcapng);
    assert_eq!(reader.comment(), Some("test capture"));
    assert_eq!(reader.hardware(), Some("x86_64"));
    assert_eq!(reader.os(), Some("Linux 6.1"));
    assert_eq!(reader.user_application(), Some("dumpcap"));
    // interfaces declared before the first packet are known at construction
    assert_eq!(reader.trace_interfaces().len(), 1);
    let iface = reader.trace_interface(0).expect("interface 0");
    assert_eq!(iface.name.as_deref(), Some("eth0"));
    assert_eq!(iface.description.as_deref(), Some("uplink"));
    assert_eq!(iface.filter.as_deref(), Some("udp port 53"));
    assert_eq!(iface.os.as_deref(), Some("Linux"));
    assert_eq!(iface.data_link_type, DataLinkType::EN10MB);
    assert_eq!(iface.timestamp_resolution, MICROS_PER_SEC);

    let packets = read_all(&mut reader);
    assert_eq!(packets.len(), 3);
    assert_eq!(packets[0].timestamp_seconds, TS_BASE);
    assert_eq!(packets[0].timestamp_microseconds, 123_456);
    assert_eq!(packets[0].capture_length, 5);
    assert_eq!(packets[0].original_length, 60);
    assert_eq!(packets[0].interface_index, Some(0));
    assert_eq!(packets[0].data(), &[1u8, 2, 3, 4, 5]);
    assert_eq!(packets[1].timestamp_seconds, TS_BASE + 1);
    assert_eq!(packets[1].data().len(), 64);
    // simple packet block: interface 0, no timestamp
    assert_eq!(packets[2].data(), &[0x0au8, 0x0b, 0x0c]);
    assert_eq!(packets[2].timestamp_seconds, 0);
    assert_eq!(packets[2].data_link_type, DataLinkType::EN10MB);
    assert!(reader.is_exhausted());
    assert_eq!(reader.termination(), Some(&Termination::EndOfStream));
}

#[test]
fn test_pcapng_mmap_and_stream_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "sample.pcapng", &sample_file());
    let mut mapped = PacketReader::new(&path, true).expect("PacketReader");
    let options = ReaderOptions::default().mmap(false).buffer_capacity(64);
    let mut streamed = PacketReader::with_options(&path, &options).expect("PacketReader");
    assert_eq!(read_all(&mut mapped), read_all(&mut streamed));
    assert_eq!(mapped.trace_interfaces(), streamed.trace_interfaces());
}

#[test]
fn test_pcapng_reader_be() {
    let dir = tempfile::tempdir().unwrap();
    let content = [SHB_BE, IDB_BE, EPB_BE].concat();
    let path = write_file(dir.path(), "be.pcapng", &content);
    let mut reader = PacketReader::new(&path, false).expect("PacketReader");
    assert!(reader.format().big_endian);
    assert_eq!(reader.trace_interface(0).unwrap().snaplen, 65535);
    let packets = read_all(&mut reader);
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].timestamp_seconds, 1);
    assert_eq!(packets[0].timestamp_microseconds, 1);
    assert_eq!(packets[0].data(), &[0xaau8, 0xbb, 0xcc]);
}

#[test]
fn test_pcapng_sections() {
    let dir = tempfile::tempdir().unwrap();
    let eth = TraceInterface::new(DataLinkType::EN10MB).with_name("eth0");
    let raw = TraceInterface::new(DataLinkType::RAW).with_name("tun0");
    let mut content = shb(vec![PcapNGOption::new(OptionCode::ShbOs, "first")]);
    content.extend(idb(&eth, 6));
    content.extend(epb(0, micros(1, 0), &[1], 1));
    // second section, big-endian, with its own interface 0
    content.extend_from_slice(SHB_BE);
    content.extend_from_slice(IDB_BE);
    content.extend_from_slice(EPB_BE);
    // third section, little-endian again
    content.extend(shb(vec![PcapNGOption::new(OptionCode::ShbOs, "third")]));
    content.extend(idb(&eth, 6));
    content.extend(idb(&raw, 6));
    content.extend(epb(1, micros(3, 0), &[3], 1));
    content.extend(epb(0, micros(4, 0), &[4], 1));
    let path = write_file(dir.path(), "sections.pcapng", &content);

    let mut reader = PacketReader::new(&path, true).expect("PacketReader");
    let packets = read_all(&mut reader);
    assert_eq!(reader.os(), Some("first"));
    assert_eq!(reader.trace_interfaces().len(), 4);
    let indexes: Vec<_> = packets.iter().map(|p| p.interface_index).collect();
    assert_eq!(indexes, vec![Some(0), Some(1), Some(3), Some(2)]);
    assert_eq!(packets[2].data_link_type, DataLinkType::RAW);
    assert_eq!(reader.trace_interface(3).unwrap().name.as_deref(), Some("tun0"));
}

#[test]
fn test_pcapng_interface_after_packets() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = shb(Vec::new());
    content.extend(idb(&TraceInterface::new(DataLinkType::EN10MB), 6));
    content.extend(epb(0, 0, &[1], 1));
    content.extend(idb(&TraceInterface::new(DataLinkType::RAW), 6));
    content.extend(epb(1, 0, &[2], 1));
    let path = write_file(dir.path(), "late.pcapng", &content);
    let mut reader = PacketReader::new(&path, true).expect("PacketReader");
    assert_eq!(reader.trace_interfaces().len(), 1);
    let packets = read_all(&mut reader);
    assert_eq!(packets[1].data_link_type, DataLinkType::RAW);
    assert_eq!(reader.trace_interfaces().len(), 2);
}

#[test]
fn test_pcapng_timestamp_resolution_and_offset() {
    let dir = tempfile::tempdir().unwrap();
    let mut nsec = TraceInterface::new(DataLinkType::EN10MB);
    nsec.timestamp_resolution = NANOS_PER_SEC;
    nsec.timestamp_offset = 100;
    let mut pow2 = TraceInterface::new(DataLinkType::EN10MB);
    pow2.timestamp_resolution = 1 << 20;
    let mut content = shb(Vec::new());
    content.extend(idb(&nsec, 9));
    content.extend(idb(&pow2, 0x80 | 20));
    content.extend(epb(0, 5_000_000_000 + 500_000_999, &[0], 1));
    content.extend(epb(1, (7 << 20) + (1 << 19), &[0], 1));
    let path = write_file(dir.path(), "tsresol.pcapng", &content);
    let mut reader = PacketReader::new(&path, true).expect("PacketReader");
    assert_eq!(reader.trace_interface(0).unwrap().timestamp_offset, 100);
    assert_eq!(reader.trace_interface(1).unwrap().timestamp_resolution, 1 << 20);
    let packets = read_all(&mut reader);
    assert_eq!(packets[0].timestamp_seconds, 105);
    assert_eq!(packets[0].timestamp_microseconds, 500_000);
    assert_eq!(packets[1].timestamp_seconds, 7);
    assert_eq!(packets[1].timestamp_microseconds, 500_000);
}

#[test]
fn test_pcapng_corrupt_block() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = shb(Vec::new());
    content.extend(idb(&TraceInterface::new(DataLinkType::EN10MB), 6));
    let good_len = content.len();
    content.extend(epb(0, 0, &[1, 2, 3, 4], 4));
    let mut bad = epb(0, 0, &[5, 6, 7, 8], 4);
    // trailing length no longer matches
    let n = bad.len();
    bad[n - 4] = 0x40;
    content.extend(bad);
    content.extend(epb(0, 0, &[9], 1));
    let path = write_file(dir.path(), "corrupt.pcapng", &content);
    for use_mmap in [true, false] {
        let mut reader = PacketReader::new(&path, use_mmap).expect("PacketReader");
        assert!(reader.next_packet().expect("first packet").is_some());
        match reader.next_packet() {
            Err(PcapError::CorruptBlock { offset, .. }) => assert_eq!(offset as usize, good_len + 36),
            r => panic!("unexpected result {:?}", r),
        }
        assert!(reader.is_exhausted());
        assert!(reader.next_packet().expect("read after error").is_none());
        assert_eq!(reader.packets_read(), 1);
    }
}

#[test]
fn test_pcapng_truncated_block() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = shb(Vec::new());
    content.extend(idb(&TraceInterface::new(DataLinkType::EN10MB), 6));
    content.extend(epb(0, 0, &[1, 2, 3, 4], 4));
    content.extend(epb(0, 0, &[5, 6, 7, 8], 4));
    content.truncate(content.len() - 6);
    let path = write_file(dir.path(), "truncated.pcapng", &content);
    for use_mmap in [true, false] {
        let mut reader = PacketReader::new(&path, use_mmap).expect("PacketReader");
        assert!(reader.next_packet().expect("first packet").is_some());
        assert!(matches!(
            reader.next_packet(),
            Err(PcapError::CorruptBlock {
                reason: "block extends past end of stream",
                ..
            })
        ));
        assert!(reader.is_exhausted());
    }
}

#[test]
fn test_pcapng_undeclared_interface() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = shb(Vec::new());
    content.extend(idb(&TraceInterface::new(DataLinkType::EN10MB), 6));
    content.extend(epb(3, 0, &[1], 1));
    let path = write_file(dir.path(), "undeclared.pcapng", &content);
    let mut reader = PacketReader::new(&path, true).expect("PacketReader");
    // the error is found while reading metadata, and reported on the first read
    assert_eq!(reader.trace_interfaces().len(), 1);
    assert!(matches!(
        reader.next_packet(),
        Err(PcapError::CorruptBlock { .. })
    ));
    assert!(reader.is_exhausted());
}

#[test]
fn test_pcapng_interface_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "sample.pcapng", &sample_file());
    let reader = PacketReader::new(&path, true).expect("PacketReader");
    assert!(matches!(
        reader.trace_interface(5),
        Err(PcapError::InterfaceNotFound(5))
    ));
}

#[test]
fn test_pcapng_invalid_section_header() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = SHB_BE.to_vec();
    // byte-order magic
    content[8] = 0;
    let path = write_file(dir.path(), "bom.pcapng", &content);
    assert!(matches!(
        PacketReader::new(&path, true),
        Err(PcapError::CorruptBlock { offset: 8, .. })
    ));

    let path = write_file(dir.path(), "short.pcapng", &SHB_BE[..16]);
    assert!(matches!(
        PacketReader::new(&path, true),
        Err(PcapError::TruncatedHeader {
            needed: 28,
            available: 16
        })
    ));
}
