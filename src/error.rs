use std::io;
use std::path::PathBuf;

use cookie_factory::GenError;
use nom::error::{ErrorKind, ParseError};
use thiserror::Error;

/// Errors raised while detecting, reading or writing capture files
#[derive(Debug, Error)]
pub enum PcapError {
    /// The leading bytes match no known magic number
    #[error("unrecognized capture format (magic 0x{0:08x})")]
    UnrecognizedFormat(u32),
    /// Fewer bytes than required to read a file or section header
    #[error("truncated header: needed {needed} bytes, {available} available")]
    TruncatedHeader { needed: usize, available: usize },
    /// Stream ended in the middle of a record or block
    #[error("truncated record at offset {offset}")]
    TruncatedRecord { offset: u64 },
    /// PCAPNG block framing is inconsistent
    #[error("corrupt block at offset {offset}: {reason}")]
    CorruptBlock { offset: u64, reason: &'static str },
    /// A record header carries impossible values
    #[error("malformed record at offset {offset}: {reason}")]
    MalformedRecord { offset: u64, reason: &'static str },
    /// The compressed stream failed frame or checksum validation
    #[error("corrupt compressed stream: {0}")]
    CorruptStream(String),
    /// No interface is declared at this index
    #[error("interface {0} not found")]
    InterfaceNotFound(usize),
    /// The output format cannot be inferred from the file name
    #[error("cannot infer capture format from {0:?}")]
    AmbiguousFormat(PathBuf),
    /// The existing file cannot be appended to in the requested way
    #[error("format mismatch: {0}")]
    FormatMismatch(String),
    /// Underlying read, write or mapping failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Low-level parser error, only seen inside block parsers
    #[error("parser error: {0:?}")]
    NomError(ErrorKind),
}

impl PcapError {
    /// Returns true if this error ends a stream because of damaged content,
    /// as opposed to a failure of the environment
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PcapError::TruncatedRecord { .. }
                | PcapError::CorruptBlock { .. }
                | PcapError::MalformedRecord { .. }
                | PcapError::CorruptStream(_)
                | PcapError::NomError(_)
        )
    }

    /// Make offsets produced by block parsers absolute, given the offset of the block
    pub(crate) fn at_offset(self, base: u64) -> PcapError {
        match self {
            PcapError::TruncatedRecord { offset } => PcapError::TruncatedRecord {
                offset: base + offset,
            },
            PcapError::CorruptBlock { offset, reason } => PcapError::CorruptBlock {
                offset: base + offset,
                reason,
            },
            PcapError::MalformedRecord { offset, reason } => PcapError::MalformedRecord {
                offset: base + offset,
                reason,
            },
            PcapError::NomError(_) => PcapError::CorruptBlock {
                offset: base,
                reason: "invalid block content",
            },
            e => e,
        }
    }
}

impl<I> ParseError<I> for PcapError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        PcapError::NomError(kind)
    }
    fn append(_input: I, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl From<GenError> for PcapError {
    fn from(e: GenError) -> Self {
        match e {
            GenError::IoError(e) => PcapError::Io(e),
            e => PcapError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("serialization failed: {:?}", e),
            )),
        }
    }
}
