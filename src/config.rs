/// Initial size of the streaming buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 65536;
/// Largest record or block the streaming buffer will grow to hold
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;
/// Snaplen written in new legacy headers and interface blocks
pub const DEFAULT_SNAPLEN: u32 = 262_144;

/// Reader configuration
#[derive(Clone, Debug)]
pub struct ReaderOptions {
    /// Map the file in memory instead of reading it through a buffer
    ///
    /// If the mapping fails, the reader falls back to buffered reads.
    pub use_mmap: bool,
    /// Initial capacity of the circular buffer used for streamed input
    pub buffer_capacity: usize,
    /// Hard limit for the circular buffer; a record needing more is treated as corrupt
    pub max_buffer_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            use_mmap: true,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl ReaderOptions {
    pub fn mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }
}

/// Writer configuration
#[derive(Clone, Debug)]
pub struct WriterOptions {
    /// Snaplen written to the legacy header and to new interface blocks
    pub snaplen: u32,
    /// `shb_userappl` option of new PCAPNG sections
    pub user_application: Option<String>,
    /// `if_tsresol` of interfaces created implicitly by the PCAPNG writer
    pub pcapng_timestamp_resolution: u8,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            snaplen: DEFAULT_SNAPLEN,
            user_application: Some(String::from("fpcap")),
            pcapng_timestamp_resolution: 6,
        }
    }
}
