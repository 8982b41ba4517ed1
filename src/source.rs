//! Byte sources for the packet reader
//!
//! Uncompressed files are memory-mapped when possible, and parsed in place. Other
//! inputs (compressed files, or when mapping is disabled or fails) are read through a
//! circular buffer, which grows when a single record does not fit, up to a hard limit.

use std::fs::File;
use std::io::{self, Cursor, Read};

use circular::Buffer;
use log::trace;
use memmap2::Mmap;

use crate::decompress::DecompressReader;
use crate::PcapError;

/// Raw file content, before decompression
pub(crate) enum Input {
    File(File),
    Mapped(Cursor<Mmap>),
}

impl Read for Input {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Input::File(f) => f.read(buf),
            Input::Mapped(c) => c.read(buf),
        }
    }
}

/// Result of a refill request
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Refill {
    /// New bytes are available
    Filled,
    /// No more bytes will ever be available
    Eof,
    /// The buffer reached its size limit without new bytes
    Full,
}

pub(crate) struct StreamSource {
    reader: DecompressReader<Input>,
    buffer: Buffer,
    max_size: usize,
    eof: bool,
}

pub(crate) enum ByteSource {
    /// Whole file mapped in memory, `pos` is the first unconsumed byte
    Mapped { mmap: Mmap, pos: usize },
    Stream(StreamSource),
}

impl ByteSource {
    pub fn mapped(mmap: Mmap) -> ByteSource {
        ByteSource::Mapped { mmap, pos: 0 }
    }

    pub fn stream(reader: DecompressReader<Input>, capacity: usize, max_size: usize) -> ByteSource {
        let capacity = capacity.clamp(64, max_size.max(64));
        ByteSource::Stream(StreamSource {
            reader,
            buffer: Buffer::with_capacity(capacity),
            max_size: max_size.max(capacity),
            eof: false,
        })
    }

    /// Unconsumed bytes currently available
    #[inline]
    pub fn data(&self) -> &[u8] {
        match self {
            ByteSource::Mapped { mmap, pos } => &mmap[*pos..],
            ByteSource::Stream(s) => s.buffer.data(),
        }
    }

    pub fn consume(&mut self, count: usize) {
        match self {
            ByteSource::Mapped { mmap, pos } => *pos = (*pos + count).min(mmap.len()),
            ByteSource::Stream(s) => {
                s.buffer.consume(count);
            }
        }
    }

    pub fn is_compressed(&self) -> bool {
        match self {
            ByteSource::Mapped { .. } => false,
            ByteSource::Stream(s) => s.reader.compression().is_compressed(),
        }
    }

    /// Make more bytes available, growing the buffer if it is full
    pub fn refill(&mut self) -> Result<Refill, PcapError> {
        let s = match self {
            ByteSource::Mapped { .. } => return Ok(Refill::Eof),
            ByteSource::Stream(s) => s,
        };
        if s.eof {
            return Ok(Refill::Eof);
        }
        s.buffer.shift();
        if s.buffer.available_space() == 0 {
            let new_size = (s.buffer.capacity() * 2).min(s.max_size);
            if !s.buffer.grow(new_size) {
                return Ok(Refill::Full);
            }
            trace!("stream buffer grown to {} bytes", new_size);
        }
        loop {
            match s.reader.read(s.buffer.space()) {
                Ok(0) => {
                    s.eof = true;
                    return Ok(Refill::Eof);
                }
                Ok(sz) => {
                    s.buffer.fill(sz);
                    return Ok(Refill::Filled);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if s.reader.compression().is_compressed() => {
                    return Err(PcapError::CorruptStream(e.to_string()))
                }
                Err(e) => return Err(PcapError::Io(e)),
            }
        }
    }

    /// Refill until at least `n` bytes are available, or no more bytes can be read
    pub fn fill_at_least(&mut self, n: usize) -> Result<usize, PcapError> {
        while self.data().len() < n {
            match self.refill()? {
                Refill::Filled => (),
                Refill::Eof | Refill::Full => break,
            }
        }
        Ok(self.data().len())
    }
}
