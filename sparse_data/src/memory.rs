use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::info;
use transfer_config::{TransferConfig, transfer_config};

use crate::dense_data::DenseData;
use crate::error::Result;
use crate::interval::Interval;
use crate::sparse_data::{Extent, Lookup, OverlapPolicy, SparseData};

/// Identifies one remote resource held in a [`SparseDataCache`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey(String);

impl ResourceKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Owned counterpart of [`Lookup`], returned once the cache lock is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Data { bytes: Bytes, valid_length: Extent },
    Gap { gap_length: Extent },
}

#[derive(Debug, Default)]
struct CacheState {
    inner: HashMap<ResourceKey, SparseData>,
    total_bytes: u64,
}

/// An in-memory cache of partially downloaded resources, one [`SparseData`] per resource.
///
/// Cloning gives another handle to the same cache.  All access is serialized through one
/// reader/writer lock, so fetch tasks for different ranges of a resource can insert concurrently.
/// The cache never evicts on its own: `is_over_capacity` and `eviction_candidates` give an
/// external policy what it needs to call `evict`.
#[derive(Debug, Clone)]
pub struct SparseDataCache {
    state: Arc<RwLock<CacheState>>,
    capacity: u64,
    max_read_bytes: u64,
    policy: OverlapPolicy,
}

impl Default for SparseDataCache {
    fn default() -> Self {
        Self::from_config(&transfer_config())
    }
}

impl SparseDataCache {
    pub fn new(capacity: u64, policy: OverlapPolicy) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            capacity,
            max_read_bytes: u64::MAX,
            policy,
        }
    }

    pub fn from_config(config: &TransferConfig) -> Self {
        let group = &config.sparse_cache;
        Self {
            max_read_bytes: group.max_read_bytes.as_u64(),
            ..Self::new(
                group.size_bytes.as_u64(),
                OverlapPolicy::from_prefer_newer(group.prefer_newer_on_overlap),
            )
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Inserts a block of validated data for `key`, merging it with what is already held.
    /// Blocks that carry no data don't create an entry for the resource.
    pub async fn insert(&self, key: &ResourceKey, block: DenseData) -> Result<()> {
        if block.interval().is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().await;
        let state = &mut *state;

        let sparse = state
            .inner
            .entry(key.clone())
            .or_insert_with(|| SparseData::with_policy(self.policy));

        let before = sparse.space_used();
        let inserted = sparse.insert(block);
        let after = sparse.space_used();

        if sparse.is_empty() {
            state.inner.remove(key);
        }
        inserted?;

        let was_over = state.total_bytes > self.capacity;
        state.total_bytes = state.total_bytes - before + after;

        if !was_over && state.total_bytes > self.capacity {
            info!(
                "SparseDataCache: {} bytes held exceeds capacity of {} bytes after insert into {key}",
                state.total_bytes, self.capacity
            );
        }

        Ok(())
    }

    pub async fn insert_bytes(&self, key: &ResourceKey, start: u64, data: impl Into<Vec<u8>>) -> Result<()> {
        self.insert(key, DenseData::from_bytes(start, data)?).await
    }

    /// Copies at most `max_len` bytes starting at `offset`, or reports the gap there.
    /// Resources the cache knows nothing about report an unbounded gap.
    pub async fn read(&self, key: &ResourceKey, offset: u64, max_len: u64) -> CacheLookup {
        let state = self.state.read().await;

        let Some(sparse) = state.inner.get(key) else {
            return CacheLookup::Gap {
                gap_length: Extent::Unbounded,
            };
        };

        match sparse.lookup(offset) {
            Lookup::Data { bytes, valid_length } => {
                let n = bytes.len().min(usize::try_from(max_len).unwrap_or(usize::MAX));
                CacheLookup::Data {
                    bytes: Bytes::copy_from_slice(&bytes[..n]),
                    valid_length,
                }
            },
            Lookup::Gap { gap_length } => CacheLookup::Gap { gap_length },
        }
    }

    /// `read` bounded by the configured maximum read size.
    pub async fn read_default(&self, key: &ResourceKey, offset: u64) -> CacheLookup {
        self.read(key, offset, self.max_read_bytes).await
    }

    /// The unknown sub-ranges of `[start, end)` for `key`.
    pub async fn missing_ranges(&self, key: &ResourceKey, start: u64, end: u64) -> Result<Vec<Interval>> {
        let state = self.state.read().await;
        match state.inner.get(key) {
            Some(sparse) => sparse.missing_ranges(start, end),
            None => SparseData::new().missing_ranges(start, end),
        }
    }

    pub async fn space_used(&self, key: &ResourceKey) -> u64 {
        self.state.read().await.inner.get(key).map_or(0, SparseData::space_used)
    }

    pub async fn total_bytes(&self) -> u64 {
        self.state.read().await.total_bytes
    }

    pub async fn num_resources(&self) -> usize {
        self.state.read().await.inner.len()
    }

    pub async fn is_over_capacity(&self) -> bool {
        self.total_bytes().await > self.capacity
    }

    /// Every held resource with the bytes it holds, largest first.
    pub async fn eviction_candidates(&self) -> Vec<(ResourceKey, u64)> {
        let state = self.state.read().await;
        let mut candidates: Vec<(ResourceKey, u64)> =
            state.inner.iter().map(|(k, v)| (k.clone(), v.space_used())).collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        candidates
    }

    /// Removes everything held for `key` and hands it back to the caller.
    pub async fn evict(&self, key: &ResourceKey) -> Option<SparseData> {
        let mut state = self.state.write().await;
        let sparse = state.inner.remove(key)?;
        state.total_bytes -= sparse.space_used();
        Some(sparse)
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.inner.clear();
        state.total_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;
    use utils::ByteSize;

    use super::*;

    fn key(name: &str) -> ResourceKey {
        ResourceKey::from(name)
    }

    #[tokio::test]
    async fn test_cache_insert_and_read() {
        let cache = SparseDataCache::new(1 << 20, OverlapPolicy::PreferNewer);
        let k = key("textures/brick.png");

        cache.insert_bytes(&k, 100, b"0123456789".to_vec()).await.unwrap();

        assert_eq!(
            cache.read(&k, 104, 100).await,
            CacheLookup::Data {
                bytes: Bytes::from_static(b"456789"),
                valid_length: Extent::Bytes(6),
            }
        );
        assert_eq!(
            cache.read(&k, 104, 2).await,
            CacheLookup::Data {
                bytes: Bytes::from_static(b"45"),
                valid_length: Extent::Bytes(6),
            }
        );
        assert_eq!(
            cache.read(&k, 0, 10).await,
            CacheLookup::Gap {
                gap_length: Extent::Bytes(100)
            }
        );
        assert_eq!(
            cache.read(&key("missing"), 0, 10).await,
            CacheLookup::Gap {
                gap_length: Extent::Unbounded
            }
        );
    }

    #[tokio::test]
    async fn test_cache_accounting_across_resources() {
        let cache = SparseDataCache::new(1 << 20, OverlapPolicy::PreferNewer);
        let a = key("a");
        let b = key("b");

        cache.insert_bytes(&a, 0, vec![0u8; 10]).await.unwrap();
        cache.insert_bytes(&a, 20, vec![0u8; 10]).await.unwrap();
        cache.insert_bytes(&b, 0, vec![0u8; 50]).await.unwrap();
        assert_eq!(cache.total_bytes().await, 70);

        // Bridging insert does not double count.
        cache.insert_bytes(&a, 5, vec![0u8; 20]).await.unwrap();
        assert_eq!(cache.space_used(&a).await, 30);
        assert_eq!(cache.total_bytes().await, 80);
        assert_eq!(cache.num_resources().await, 2);

        assert_eq!(cache.eviction_candidates().await, vec![(b.clone(), 50), (a.clone(), 30)]);

        let evicted = cache.evict(&b).await.unwrap();
        assert_eq!(evicted.space_used(), 50);
        assert_eq!(cache.total_bytes().await, 30);
        assert!(cache.evict(&b).await.is_none());

        cache.clear().await;
        assert_eq!(cache.total_bytes().await, 0);
        assert_eq!(cache.num_resources().await, 0);
    }

    #[traced_test]
    #[tokio::test]
    async fn test_cache_over_capacity() {
        let cache = SparseDataCache::new(100, OverlapPolicy::PreferNewer);
        let k = key("mesh");

        cache.insert_bytes(&k, 0, vec![0u8; 60]).await.unwrap();
        assert!(!cache.is_over_capacity().await);

        cache.insert_bytes(&k, 200, vec![0u8; 60]).await.unwrap();
        assert!(cache.is_over_capacity().await);
        assert!(logs_contain("exceeds capacity"));

        // Nothing is evicted automatically.
        assert_eq!(cache.space_used(&k).await, 120);
    }

    #[tokio::test]
    async fn test_cache_empty_insert_adds_no_resource() {
        let cache = SparseDataCache::new(1 << 20, OverlapPolicy::PreferNewer);
        let k = key("empty");

        cache.insert_bytes(&k, 10, Vec::<u8>::new()).await.unwrap();
        assert_eq!(cache.num_resources().await, 0);
        assert!(cache.eviction_candidates().await.is_empty());

        cache.insert_bytes(&k, 10, vec![0u8; 4]).await.unwrap();
        cache.insert_bytes(&k, 14, Vec::<u8>::new()).await.unwrap();
        assert_eq!(cache.num_resources().await, 1);
        assert_eq!(cache.eviction_candidates().await, vec![(k.clone(), 4)]);
    }

    #[tokio::test]
    async fn test_cache_missing_ranges() {
        let cache = SparseDataCache::new(1 << 20, OverlapPolicy::PreferNewer);
        let k = key("stream");

        assert_eq!(cache.missing_ranges(&k, 0, 10).await.unwrap(), vec![Interval::new(0, 10).unwrap()]);

        cache.insert_bytes(&k, 2, vec![0u8; 3]).await.unwrap();
        assert_eq!(
            cache.missing_ranges(&k, 0, 10).await.unwrap(),
            vec![Interval::new(0, 2).unwrap(), Interval::new(5, 10).unwrap()]
        );
    }

    #[tokio::test]
    async fn test_cache_policy_from_config() {
        let mut config = TransferConfig::default();
        config.sparse_cache.prefer_newer_on_overlap = false;
        config.sparse_cache.max_read_bytes = ByteSize::new(4);
        config.sparse_cache.size_bytes = ByteSize::new(1000);

        let cache = SparseDataCache::from_config(&config);
        assert_eq!(cache.capacity(), 1000);

        let k = key("config");
        cache.insert_bytes(&k, 0, b"AAAAAAAA".to_vec()).await.unwrap();
        cache.insert_bytes(&k, 4, b"BBBBBBBB".to_vec()).await.unwrap();

        assert_eq!(
            cache.read_default(&k, 2).await,
            CacheLookup::Data {
                bytes: Bytes::from_static(b"AAAA"),
                valid_length: Extent::Bytes(10),
            }
        );
        assert_eq!(
            cache.read_default(&k, 8).await,
            CacheLookup::Data {
                bytes: Bytes::from_static(b"BBBB"),
                valid_length: Extent::Bytes(4),
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_inserts_of_one_resource() {
        let cache = SparseDataCache::new(1 << 20, OverlapPolicy::PreferNewer);
        let k = key("parallel");

        let mut handles = Vec::new();
        for i in 0..16u64 {
            let cache = cache.clone();
            let k = k.clone();
            handles.push(tokio::spawn(async move {
                cache.insert_bytes(&k, i * 64, vec![i as u8; 64]).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(cache.space_used(&k).await, 16 * 64);
        assert!(cache.missing_ranges(&k, 0, 16 * 64).await.unwrap().is_empty());
        match cache.read(&k, 64 * 3, 64).await {
            CacheLookup::Data { bytes, valid_length } => {
                assert_eq!(bytes, Bytes::from(vec![3u8; 64]));
                assert_eq!(valid_length, Extent::Bytes(13 * 64));
            },
            other => panic!("expected data, got {other:?}"),
        }
    }
}
