use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fpcap::{DataLinkType, Packet, PacketReader, ReaderOptions, Writer, WriterFormat};
use std::fs;
use std::path::{Path, PathBuf};

const NUM_PACKETS: u32 = 10_000;

fn write_capture(dir: &Path) -> PathBuf {
    let path = dir.join("bench.pcapng");
    let mut writer = Writer::get_writer(&path, false, WriterFormat::Pcapng).unwrap();
    let data = [0x42u8; 1500];
    for i in 0..NUM_PACKETS {
        let len = 64 + (i as usize * 97) % 1436;
        writer
            .write(&Packet::new(1_700_000_000 + u64::from(i), i % 1_000_000, DataLinkType::EN10MB, &data[..len]))
            .unwrap();
    }
    writer.close().unwrap();
    path
}

fn compress(path: &Path) -> PathBuf {
    let content = fs::read(path).unwrap();
    let zpath = path.with_extension("pcapng.zst");
    fs::write(&zpath, zstd::encode_all(&content[..], 3).unwrap()).unwrap();
    zpath
}

fn do_read(path: &Path, options: &ReaderOptions) {
    let mut reader = PacketReader::with_options(path, options).unwrap();
    let mut num_packets = 0;
    while let Some(p) = reader.next_packet().unwrap() {
        criterion::black_box(p.data());
        num_packets += 1;
    }
    assert_eq!(num_packets, NUM_PACKETS);
}

fn bench_read_pcapng(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_capture(dir.path());
    let zpath = compress(&path);
    let size = fs::metadata(&path).unwrap().len();
    let mut group = c.benchmark_group("read_pcapng");
    group.throughput(Throughput::Bytes(size));
    group.bench_function("mmap", |b| b.iter(|| do_read(&path, &ReaderOptions::default())));
    group.bench_function("zstd", |b| b.iter(|| do_read(&zpath, &ReaderOptions::default())));
    group.finish();
}

fn bench_read_pcapng_buffer_size(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_capture(dir.path());
    let mut group = c.benchmark_group("read_pcapng buffer_size");
    const KB16: usize = 16384;
    for buffer_size in [KB16, KB16 * 2, KB16 * 4, KB16 * 8, KB16 * 16].iter() {
        group.throughput(Throughput::Bytes(*buffer_size as u64));
        let options = ReaderOptions::default().mmap(false).buffer_capacity(*buffer_size);
        group.bench_with_input(BenchmarkId::from_parameter(buffer_size), &options, |b, options| {
            b.iter(|| do_read(&path, options))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_read_pcapng, bench_read_pcapng_buffer_size);
criterion_main!(benches);
