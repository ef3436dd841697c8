//! Bounded in-memory TTL cache.
//!
//! Entries expire `ttl` after insertion and are never returned once
//! expired. When full, expired entries are dropped first, then the oldest
//! insertion is evicted. Time is passed in explicitly so callers (and
//! tests) control the clock.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> TtlCache<K, V> {
    /// `capacity` is clamped to at least one entry.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<&V> {
        self.entries.get(key).and_then(|entry| {
            if now - entry.inserted_at < self.ttl {
                Some(&entry.value)
            } else {
                None
            }
        })
    }

    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_expired(now);
            if self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    /// Remove expired entries.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now - entry.inserted_at < ttl);
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.inserted_at)
            .map(|(k, _)| k.clone());
        if let Some(k) = oldest {
            self.entries.remove(&k);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
