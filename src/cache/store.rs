//! TTL-keyed typed cache over a pluggable storage backend
//!
//! Entries are stored as JSON envelopes stamped with their write time.
//! Reads apply the TTL transparently and treat corrupt payloads as absent;
//! expired entries are only removed by an explicit invalidate, so reads
//! stay side-effect free.

use crate::models::now_millis;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Raw string storage the cache sits on. Implementations are local and
/// fast; no method blocks on network I/O.
pub trait StorageBackend {
    fn read_raw(&self, key: &str) -> Option<String>;
    fn write_raw(&mut self, key: &str, payload: &str);
    fn delete_raw(&mut self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// Stored envelope: the value plus its write timestamp
#[derive(Debug, Deserialize)]
struct CacheEntry<T> {
    value: T,
    stored_at: i64,
}

#[derive(Debug, Serialize)]
struct CacheEntryRef<'a, T> {
    value: &'a T,
    stored_at: i64,
}

/// Cache size summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entry_count: usize,
    pub approx_byte_size: usize,
}

/// TTL-keyed cache. TTL policy belongs to the caller: each read names the
/// TTL that applies to its key.
pub struct CacheStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> CacheStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Read a value, treating expired or corrupt entries as absent
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        self.get_at(key, ttl, now_millis())
    }

    pub(crate) fn get_at<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl: Duration,
        now_ms: i64,
    ) -> Option<T> {
        let raw = self.backend.read_raw(key)?;
        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Discarding corrupt cache entry for {}: {}", key, e);
                return None;
            }
        };
        let age = now_ms - entry.stored_at;
        if age >= ttl.as_millis() as i64 {
            log::debug!("Cache entry for {} expired ({} ms old)", key, age);
            return None;
        }
        Some(entry.value)
    }

    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) {
        self.put_at(key, value, now_millis());
    }

    pub(crate) fn put_at<T: Serialize>(&mut self, key: &str, value: &T, now_ms: i64) {
        let envelope = CacheEntryRef {
            value,
            stored_at: now_ms,
        };
        match serde_json::to_string(&envelope) {
            Ok(json) => self.backend.write_raw(key, &json),
            Err(e) => log::warn!("Failed to serialize cache entry for {}: {}", key, e),
        }
    }

    pub fn invalidate(&mut self, key: &str) {
        self.backend.delete_raw(key);
    }

    /// Write timestamp of an entry, if present and readable
    pub(crate) fn stored_at(&self, key: &str) -> Option<i64> {
        let raw = self.backend.read_raw(key)?;
        serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw)
            .ok()
            .map(|entry| entry.stored_at)
    }

    pub fn keys(&self) -> Vec<String> {
        self.backend.keys()
    }

    pub fn stats(&self) -> CacheStats {
        let keys = self.backend.keys();
        let approx_byte_size = keys
            .iter()
            .filter_map(|k| self.backend.read_raw(k))
            .map(|payload| payload.len())
            .sum();
        CacheStats {
            entry_count: keys.len(),
            approx_byte_size,
        }
    }
}

/// In-memory backend for per-session state and tests
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read_raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write_raw(&mut self, key: &str, payload: &str) {
        self.entries.insert(key.to_string(), payload.to_string());
    }

    fn delete_raw(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn store() -> CacheStore<MemoryBackend> {
        CacheStore::new(MemoryBackend::new())
    }

    #[test]
    fn put_then_get_roundtrip() {
        let mut store = store();
        store.put("k", &vec![1u32, 2, 3]);
        let value: Option<Vec<u32>> = store.get("k", TTL);
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[test]
    fn get_applies_ttl_at_the_boundary() {
        let mut store = store();
        let t0 = 1_000_000;
        store.put_at("k", &"v".to_string(), t0);

        let ttl_ms = TTL.as_millis() as i64;
        let present: Option<String> = store.get_at("k", TTL, t0 + ttl_ms - 1);
        assert_eq!(present.as_deref(), Some("v"));

        let absent: Option<String> = store.get_at("k", TTL, t0 + ttl_ms + 1);
        assert_eq!(absent, None);
    }

    #[test]
    fn expired_entry_is_not_auto_deleted() {
        let mut store = store();
        store.put_at("k", &"v".to_string(), 0);

        let miss: Option<String> = store.get_at("k", TTL, i64::MAX / 2);
        assert!(miss.is_none());
        // Entry is still physically present until invalidated
        assert_eq!(store.keys(), vec!["k".to_string()]);
    }

    #[test]
    fn corrupt_entry_reads_as_miss() {
        let mut store = store();
        store.backend.write_raw("k", "{ not valid json");
        let value: Option<String> = store.get("k", TTL);
        assert!(value.is_none());
    }

    #[test]
    fn invalidate_removes_the_entry() {
        let mut store = store();
        store.put("k", &1u32);
        store.invalidate("k");
        let value: Option<u32> = store.get("k", TTL);
        assert!(value.is_none());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn stats_counts_entries_and_bytes() {
        let mut store = store();
        assert_eq!(store.stats().entry_count, 0);

        store.put("a", &"x".to_string());
        store.put("b", &"y".to_string());

        let stats = store.stats();
        assert_eq!(stats.entry_count, 2);
        assert!(stats.approx_byte_size > 0);
    }
}
