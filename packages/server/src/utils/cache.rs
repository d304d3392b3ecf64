use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Shared key-value store whose entries expire after a fixed time-to-live.
///
/// Readers may see a value up to `ttl` old. Nothing is invalidated on write.
/// Stale entries are dropped on lookup and swept on every insert.
pub struct PageCache<V> {
    entries: DashMap<String, Entry<V>>,
    ttl: Duration,
}

impl<V: Clone> PageCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Return a clone of the cached value if it is still fresh.
    pub fn get(&self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries
                .remove_if(key, |_, entry| entry.stored_at.elapsed() >= self.ttl);
        }
        None
    }

    /// Store `value` under `key`, dropping every expired entry first.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        self.entries.insert(
            key.into(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
