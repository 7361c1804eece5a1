/// Approximately how much payload data to hold in memory before spilling
/// accumulated records to on-disk buckets. If the total stays below this
/// threshold, no intermediary data is ever written to disk.
pub const MAX_MEM_BUFFER_SIZE: u64 = 1024 * 1024 * 1024; // 1 GiB

/// Number of buckets records are split among once the in-memory buffer
/// spills. Each bucket is sorted fully in memory on read, so the expected
/// per-bucket footprint is `total_bytes / BUCKETS_NUMBER`.
pub const BUCKETS_NUMBER: usize = 1000;

/// Width, in bytes, of the on-disk hashed-key frame (128 bits).
pub const HKEY_SIZE_BYTES: usize = 16;

/// Runtime-tunable knobs for a [`crate::Shuffler`] instance.
///
/// Production callers use [`ShufflerConfig::default`]; tests override
/// `max_mem_buffer_size` (commonly to `0`) to force the disk-spilling path
/// deterministically without allocating gigabytes of test data.
#[derive(Clone, Debug)]
pub struct ShufflerConfig {
    pub max_mem_buffer_size: u64,
    pub buckets_number: usize,
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,
}

impl Default for ShufflerConfig {
    fn default() -> Self {
        Self {
            max_mem_buffer_size: MAX_MEM_BUFFER_SIZE,
            buckets_number: BUCKETS_NUMBER,
            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl ShufflerConfig {
    pub fn with_max_mem_buffer_size(mut self, bytes: u64) -> Self {
        self.max_mem_buffer_size = bytes;
        self
    }

    pub fn with_buckets_number(mut self, n: usize) -> Self {
        self.buckets_number = n.max(1);
        self
    }

    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(4 * 1024);
        self.write_buffer_bytes = write_bytes.max(4 * 1024);
        self
    }
}
