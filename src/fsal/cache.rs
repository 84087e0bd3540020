// Bounded LRU cache
//
// Fixed-capacity map shared by all request tasks. When full, inserting a new
// key evicts the least recently used entry. The lock is never held across
// I/O or an await point.

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

pub struct BoundedCache<K, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Insert or replace an entry, marking it most recently used
    ///
    /// Returns true if another entry was evicted to make room.
    pub fn insert(&self, key: K, value: V) -> bool {
        let mut cache = self.inner.lock();
        let evicts = !cache.contains(&key) && cache.len() == cache.cap().get();
        cache.put(key, value);
        evicts
    }

    /// Look up an entry, refreshing its recency
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
