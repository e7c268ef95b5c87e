use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, LazyLock},
};

use log::trace;
use parking_lot::Mutex;

use crate::Result;

/// Default number of blocks a disk matrix keeps decoded.
pub const DEFAULT_CACHE_CAPACITY: usize = 65536;

/// Environment variable overriding [`DEFAULT_CACHE_CAPACITY`] process-wide.
pub const CACHE_CAPACITY_ENV: &str = "BYTESCORE_CACHE_BLOCKS";

static CONFIGURED_CAPACITY: LazyLock<usize> = LazyLock::new(|| {
    std::env::var(CACHE_CAPACITY_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_CACHE_CAPACITY)
});

/// `(taxon, block index)`
pub type BlockKey = (usize, usize);

#[derive(Default)]
struct CacheState {
    blocks: HashMap<BlockKey, Arc<[u8]>>,
    /// Keys in insertion order; the front is evicted first
    order: VecDeque<BlockKey>,
}

/// A bounded map of decoded blocks with insertion-order eviction.
///
/// Once more than `capacity` blocks are held, the block inserted earliest is dropped,
/// regardless of how recently it was read. Loads run outside the lock: two threads
/// missing on the same key may both load it, and the first insert wins.
pub struct BlockCache {
    capacity: usize,
    state: Mutex<CacheState>,
}
impl Default for BlockCache {
    fn default() -> Self {
        Self::new(*CONFIGURED_CAPACITY)
    }
}
impl BlockCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, key: BlockKey) -> bool {
        self.state.lock().blocks.contains_key(&key)
    }

    #[must_use]
    pub fn get(&self, key: BlockKey) -> Option<Arc<[u8]>> {
        self.state.lock().blocks.get(&key).cloned()
    }

    /// Returns the cached block for `key`, calling `load` on a miss.
    ///
    /// A failed load leaves the cache untouched and returns the error.
    pub fn get_or_load<F>(&self, key: BlockKey, load: F) -> Result<Arc<[u8]>>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        if let Some(block) = self.get(key) {
            return Ok(block);
        }
        trace!("block cache miss for taxon {} block {}", key.0, key.1);
        let loaded: Arc<[u8]> = load()?.into();
        Ok(self.insert(key, loaded))
    }

    fn insert(&self, key: BlockKey, block: Arc<[u8]>) -> Arc<[u8]> {
        let mut state = self.state.lock();
        if let Some(existing) = state.blocks.get(&key) {
            return Arc::clone(existing);
        }
        state.blocks.insert(key, Arc::clone(&block));
        state.order.push_back(key);
        while state.blocks.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.blocks.remove(&oldest);
            trace!("evicted taxon {} block {} from block cache", oldest.0, oldest.1);
        }
        block
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.blocks.clear();
        state.order.clear();
    }
}
