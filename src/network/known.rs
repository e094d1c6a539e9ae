use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// Hashes of blocks already handled by gossip, bounded with LRU eviction.
pub struct KnownBlocks {
    seen: Mutex<LruCache<String, ()>>,
}

impl KnownBlocks {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            seen: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Record `hash`. Returns `true` only the first time it is seen.
    pub fn mark_seen(&self, hash: &str) -> bool {
        let mut seen = self.seen.lock().expect("mutex poisoned");
        if seen.get(hash).is_some() {
            return false;
        }
        seen.put(hash.to_string(), ());
        true
    }

    pub fn len(&self) -> usize {
        self.seen.lock().expect("mutex poisoned").len()
    }
}
