use utils::ByteSize;

pub const DEFAULT_SPARSE_CACHE_CAPACITY: u64 = 1_000_000_000; // 1 GB

crate::config_group!({
    /// Capacity hint for the in-memory sparse data cache.  Crossing it does not evict anything;
    /// the cache only reports that it is over capacity so an external policy can act on it.
    ///
    /// The default value is 1gb.
    ///
    /// Use the environment variable `TRANSFER_SPARSE_CACHE_SIZE_BYTES` to set this value.
    ref size_bytes: ByteSize = ByteSize::new(DEFAULT_SPARSE_CACHE_CAPACITY);

    /// When an inserted range overlaps bytes that are already held, keep the newly inserted
    /// bytes.  If false, the bytes that were already held are kept instead.
    ///
    /// The default value is true.
    ///
    /// Use the environment variable `TRANSFER_SPARSE_CACHE_PREFER_NEWER_ON_OVERLAP` to set this value.
    ref prefer_newer_on_overlap: bool = true;

    /// Upper bound on the number of bytes copied out of the cache by a single default read.
    ///
    /// The default value is 16mb.
    ///
    /// Use the environment variable `TRANSFER_SPARSE_CACHE_MAX_READ_BYTES` to set this value.
    ref max_read_bytes: ByteSize = ByteSize::new(16_000_000);
});
