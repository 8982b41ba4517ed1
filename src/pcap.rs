//! PCAP file format
//!
//! See <https://wiki.wireshark.org/Development/LibpcapFileFormat> for details.
//!
//! A legacy capture file starts with a 24-byte global header, followed by records made of a
//! 16-byte header and the packet data. The byte order and timestamp precision are given by
//! the magic number. The "modified" variant (Kuznetzov patches) adds 8 bytes to every record
//! header, which are skipped.

pub(crate) mod frame;
pub(crate) mod header;
pub(crate) mod parser;
mod writer;

pub use frame::*;
pub use header::*;
pub use writer::*;
