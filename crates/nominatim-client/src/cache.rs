//! Response caches for reverse geocoding lookups

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use moka::Expiry;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::types::{CacheStats, RawLocation};

/// Storage for geocoder responses, keyed by quantized coordinates
///
/// Only successful lookups are ever stored, so a transient upstream error is
/// retried on the next lookup.
pub trait GeocodeCache: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Option<RawLocation>> + Send;

    fn put(
        &self,
        key: &str,
        value: RawLocation,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Drop every cached response
    fn invalidate_all(&self) -> impl Future<Output = Result<()>> + Send;

    fn stats(&self) -> CacheStats;
}

/// Cache key for a coordinate pair, rounded to 6 decimal places (~0.1m)
pub fn cache_key(latitude: f64, longitude: f64) -> String {
    format!("{:.6},{:.6}", latitude, longitude)
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    location: RawLocation,
    ttl: Duration,
    expires_at: Instant,
}

/// Evicts every entry after the TTL it was stored with
struct EntryExpiry;

impl Expiry<String, MemoryEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache backed by moka, lives as long as the process
pub struct MemoryCache {
    cache: Cache<String, MemoryEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GeocodeCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<RawLocation> {
        match self.cache.get(key).await {
            Some(entry) if entry.expires_at > Instant::now() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.location)
            }
            Some(_) => {
                debug!(key, "Cache entry expired");
                self.cache.invalidate(key).await;
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn put(&self, key: &str, value: RawLocation, ttl: Duration) -> Result<()> {
        let entry = MemoryEntry {
            location: value,
            ttl,
            expires_at: Instant::now() + ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<()> {
        self.cache.invalidate_all();
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
