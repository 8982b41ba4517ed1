//! Decompression adapter
//!
//! [`DecompressReader`] exposes the decompressed bytes of its source through `Read`,
//! so parsers work the same way on raw and compressed captures. Decompression is
//! streaming: memory use does not depend on the size of the file.

use std::fmt;
use std::io::{self, BufReader, Read};

/// Compression of the outer stream
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compression {
    None,
    /// Zstandard frames (`.zst`)
    Zstd,
}

impl Compression {
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Compression::None)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Compression::None => f.write_str("none"),
            Compression::Zstd => f.write_str("zstd"),
        }
    }
}

/// Reader over the decompressed content of `R`
///
/// Enum dispatch over the supported compressions. Frame boundaries (including
/// concatenated zstd frames) are handled by the decoder.
pub enum DecompressReader<R: Read> {
    /// No compression, pass-through
    None(R),
    Zstd(zstd::Decoder<'static, BufReader<R>>),
}

impl<R: Read> DecompressReader<R> {
    pub fn new(source: R, compression: Compression) -> io::Result<Self> {
        match compression {
            Compression::None => Ok(DecompressReader::None(source)),
            Compression::Zstd => Ok(DecompressReader::Zstd(zstd::Decoder::new(source)?)),
        }
    }

    pub fn compression(&self) -> Compression {
        match self {
            DecompressReader::None(_) => Compression::None,
            DecompressReader::Zstd(_) => Compression::Zstd,
        }
    }
}

impl<R: Read> Read for DecompressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            DecompressReader::None(r) => r.read(buf),
            DecompressReader::Zstd(r) => r.read(buf),
        }
    }
}
