//! # PCAP, PCAPNG and zstd capture reader and writer
//!
//! This crate reads legacy PCAP (all byte orders, microsecond and nanosecond precision,
//! and the "modified" variant) and PCAPNG files, optionally compressed with zstd, and
//! writes PCAP and PCAPNG files.
//!
//! Uncompressed files are memory-mapped and parsed in place: packet data is not copied.
//! Compressed files, or files that cannot be mapped, are streamed through a bounded
//! circular buffer, so the size of the capture does not matter.
//!
//! # Example: reading
//!
//! ```rust,no_run
//! use fpcap::PacketReader;
//!
//! # fn main() -> Result<(), fpcap::PcapError> {
//! let mut reader = PacketReader::new("capture.pcap.zst", true)?;
//! println!("interfaces: {:?}", reader.trace_interfaces());
//! let mut count = 0;
//! while let Some(packet) = reader.next_packet()? {
//!     count += 1;
//!     println!("{:?}", packet);
//! }
//! println!("{} packets", count);
//! # Ok(())
//! # }
//! ```
//!
//! Packets borrow their data from the reader. Use [`Packet::into_owned`], or the
//! [`PacketReader::owned_packets`] iterator, to keep them longer.
//!
//! # Example: writing
//!
//! ```rust,no_run
//! use fpcap::{DataLinkType, Packet, Writer, WriterFormat};
//!
//! # fn main() -> Result<(), fpcap::PcapError> {
//! let mut writer = Writer::get_writer("out.pcapng", false, WriterFormat::Auto)?;
//! let data = [0u8; 60];
//! writer.write(&Packet::new(1_700_000_000, 0, DataLinkType::EN10MB, &data[..]))?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Errors while reading end iteration: the error is returned once, then the reader is
//! exhausted. Packets read before the error stay valid.

mod config;
mod decompress;
mod error;
mod linktype;
mod magic;
mod packet;
mod reader;
mod serialize;
mod source;
mod utils;
mod writer;

mod endianness;

pub mod pcap;
pub mod pcapng;

pub use config::*;
pub use decompress::Compression;
pub use error::*;
pub use linktype::*;
pub use magic::*;
pub use packet::{CaptureMetadata, Packet, TraceInterface, MICROS_PER_SEC, NANOS_PER_SEC};
pub use reader::*;
pub use serialize::*;
pub use utils::Data;
pub use writer::*;
