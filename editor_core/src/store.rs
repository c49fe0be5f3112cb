//! Bounded content-hash stores shared with background tasks.
//!
//! Both the token cache and the semantic cache map a hash of the full buffer
//! text, scoped by what the text was read as (its language or its path), to a
//! computed result. Each store has a fixed capacity and one of two
//! overflow policies: drop everything (the historical behavior) or evict the
//! least recently used entry.

use crate::error::ConfigError;
use crate::semantic::SemanticMap;
use crate::syntax::Token;
use lru::LruCache;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What a bounded store does when it grows past its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Clear the whole store, then keep only the entry just inserted.
    #[default]
    ClearAll,
    /// Evict the least recently used entry.
    Lru,
}

impl FromStr for EvictionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clear-all" | "clearall" | "clear" => Ok(Self::ClearAll),
            "lru" => Ok(Self::Lru),
            _ => Err(ConfigError::UnknownEviction(s.to_string())),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClearAll => f.write_str("clear-all"),
            Self::Lru => f.write_str("lru"),
        }
    }
}

/// Hashes a full buffer text into a store key.
pub fn content_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Hashes a buffer text together with the scope its result depends on.
/// Equal texts under different scopes get different keys.
pub fn scoped_hash<S: Hash + ?Sized>(scope: &S, text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    scope.hash(&mut hasher);
    text.hash(&mut hasher);
    hasher.finish()
}

enum Entries<V> {
    ClearAll(HashMap<u64, V>),
    Lru(LruCache<u64, V>),
}

/// A capacity-bounded map keyed by content hash.
pub struct BoundedCache<V> {
    entries: Entries<V>,
    capacity: usize,
}

impl<V: Clone> BoundedCache<V> {
    /// Creates an empty cache holding at most `capacity` entries.
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        let capacity = capacity.max(1);
        let entries = match policy {
            EvictionPolicy::ClearAll => Entries::ClearAll(HashMap::with_capacity(capacity + 1)),
            EvictionPolicy::Lru => Entries::Lru(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        };
        Self { entries, capacity }
    }

    pub fn policy(&self) -> EvictionPolicy {
        match self.entries {
            Entries::ClearAll(_) => EvictionPolicy::ClearAll,
            Entries::Lru(_) => EvictionPolicy::Lru,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Looks up a key. Under [`EvictionPolicy::Lru`] this refreshes its recency.
    pub fn get(&mut self, key: u64) -> Option<V> {
        match &mut self.entries {
            Entries::ClearAll(map) => map.get(&key).cloned(),
            Entries::Lru(cache) => cache.get(&key).cloned(),
        }
    }

    pub fn contains(&self, key: u64) -> bool {
        match &self.entries {
            Entries::ClearAll(map) => map.contains_key(&key),
            Entries::Lru(cache) => cache.contains(&key),
        }
    }

    /// Inserts an entry. Returns the number of entries evicted to make room.
    pub fn insert(&mut self, key: u64, value: V) -> usize {
        match &mut self.entries {
            Entries::ClearAll(map) => {
                map.insert(key, value.clone());
                if map.len() > self.capacity {
                    let evicted = map.len() - 1;
                    map.clear();
                    map.insert(key, value);
                    evicted
                } else {
                    0
                }
            }
            Entries::Lru(cache) => match cache.push(key, value) {
                Some((old_key, _)) if old_key != key => 1,
                _ => 0,
            },
        }
    }

    pub fn len(&self) -> usize {
        match &self.entries {
            Entries::ClearAll(map) => map.len(),
            Entries::Lru(cache) => cache.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        match &mut self.entries {
            Entries::ClearAll(map) => map.clear(),
            Entries::Lru(cache) => cache.clear(),
        }
    }
}

/// A [`BoundedCache`] behind a mutex, shared between the editing thread and
/// the background task of one pipeline.
pub struct ContentStore<V> {
    name: &'static str,
    inner: Mutex<BoundedCache<V>>,
}

/// Token results by content hash.
pub type TokenStore = ContentStore<Arc<Vec<Token>>>;

/// Semantic lookup tables by content hash.
pub type SemanticStore = ContentStore<Arc<SemanticMap>>;

impl<V: Clone> ContentStore<V> {
    pub fn new(name: &'static str, capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            name,
            inner: Mutex::new(BoundedCache::new(capacity, policy)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoundedCache<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up the result computed for a content hash.
    pub fn get(&self, key: u64) -> Option<V> {
        let hit = self.lock().get(key);
        log::trace!(
            "{} cache {} for {:016x}",
            self.name,
            if hit.is_some() { "hit" } else { "miss" },
            key
        );
        hit
    }

    /// Stores a result, evicting per the store's policy.
    pub fn insert(&self, key: u64, value: V) {
        let mut cache = self.lock();
        let evicted = cache.insert(key, value);
        if evicted > 0 {
            log::debug!(
                "{} cache over capacity ({}), evicted {} entr{} ({})",
                self.name,
                cache.capacity(),
                evicted,
                if evicted == 1 { "y" } else { "ies" },
                cache.policy()
            );
        }
    }

    pub fn contains(&self, key: u64) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.lock().policy()
    }
}

impl<V> fmt::Debug for ContentStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStore").field("name", &self.name).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_all_drops_everything_on_overflow() {
        let mut cache = BoundedCache::new(3, EvictionPolicy::ClearAll);
        for key in 0..3 {
            assert_eq!(cache.insert(key, key * 10), 0);
        }
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.insert(99, 990), 3);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(99), Some(990));
        assert_eq!(cache.get(0), None);
    }

    #[test]
    fn test_lru_evicts_least_recent() {
        let mut cache = BoundedCache::new(2, EvictionPolicy::Lru);
        cache.insert(1, "one");
        cache.insert(2, "two");
        // touch 1 so 2 becomes the eviction candidate
        assert_eq!(cache.get(1), Some("one"));

        assert_eq!(cache.insert(3, "three"), 1);
        assert!(cache.contains(1));
        assert!(!cache.contains(2));
        assert!(cache.contains(3));
    }

    #[test]
    fn test_reinserting_same_key_does_not_evict() {
        let mut cache = BoundedCache::new(1, EvictionPolicy::Lru);
        cache.insert(7, 1);
        assert_eq!(cache.insert(7, 2), 0);
        assert_eq!(cache.get(7), Some(2));

        let mut cache = BoundedCache::new(1, EvictionPolicy::ClearAll);
        cache.insert(7, 1);
        assert_eq!(cache.insert(7, 2), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("lru".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lru);
        assert_eq!("Clear-All".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::ClearAll);
        assert!("fifo".parse::<EvictionPolicy>().is_err());
    }

    #[test]
    fn test_shared_store() {
        let store: ContentStore<Arc<Vec<u32>>> = ContentStore::new("test", 2, EvictionPolicy::ClearAll);
        let key = content_hash("int x;");
        assert!(store.get(key).is_none());
        store.insert(key, Arc::new(vec![1, 2]));
        assert_eq!(store.get(key).as_deref(), Some(&vec![1, 2]));
        assert_eq!(content_hash("int x;"), key);
        assert_ne!(content_hash("int y;"), key);
    }

    #[test]
    fn test_scoped_hash_separates_scopes() {
        let text = "int value;";
        assert_eq!(scoped_hash("cpp", text), scoped_hash("cpp", text));
        assert_ne!(scoped_hash("cpp", text), scoped_hash("txt", text));
        assert_ne!(
            scoped_hash(std::path::Path::new("a.cpp"), text),
            scoped_hash(std::path::Path::new(""), text)
        );
    }
}
