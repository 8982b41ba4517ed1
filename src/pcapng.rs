//! PCAPNG file format
//!
//! See <https://github.com/pcapng/pcapng> for details.
//!
//! ## File format and parsing
//!
//! A capture file is organized in blocks. Blocks are organized in sections, each section
//! starting with a Section Header Block (SHB), and followed by blocks (interface description,
//! statistics, packets, etc.).
//! A file is usually composed of one section, but can contain multiple sections. Interfaces are
//! local to their section: an Enhanced Packet Block refers to the n-th Interface Description
//! Block of its own section.
//!
//! ## Endianness
//!
//! The endianness of a block is indicated by the Section Header Block that started the section
//! containing this block. Since a file can contain several sections, a single file can contain
//! both endianness variants.
//!
//! Only the blocks needed to extract packets are decoded (SHB, IDB, EPB, SPB and the obsolete
//! Packet Block); all other block types are skipped using their length fields.

mod block;
pub(crate) mod enhanced_packet;
pub(crate) mod interface_description;
mod option;
mod packet_block;
pub(crate) mod parser;
pub(crate) mod section_header;
mod simple_packet;
mod time;
mod unknown;
mod writer;

pub use block::*;
pub use enhanced_packet::*;
pub use interface_description::*;
pub use option::*;
pub use packet_block::*;
pub use section_header::*;
pub use simple_packet::*;
pub use time::*;
pub use unknown::*;
pub use writer::*;

/// Section Header Block magic
pub const SHB_MAGIC: u32 = 0x0A0D_0D0A;
/// Interface Description Block magic
pub const IDB_MAGIC: u32 = 0x0000_0001;
/// Packet Block magic (obsolete)
pub const PB_MAGIC: u32 = 0x0000_0002;
/// Simple Packet Block magic
pub const SPB_MAGIC: u32 = 0x0000_0003;
/// Name Resolution Block magic
pub const NRB_MAGIC: u32 = 0x0000_0004;
/// Interface Statistic Block magic
pub const ISB_MAGIC: u32 = 0x0000_0005;
/// Enhanced Packet Block magic
pub const EPB_MAGIC: u32 = 0x0000_0006;

/// Byte Order magic
pub const BOM_MAGIC: u32 = 0x1A2B_3C4D;
