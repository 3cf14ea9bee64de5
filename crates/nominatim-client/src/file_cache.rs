//! File-based response cache that survives process restarts

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::GeocodeCache;
use crate::error::Result;
use crate::types::{CacheStats, RawLocation};

/// On-disk representation of a cached response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCacheEntry {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub location: RawLocation,
}

/// A response cache storing one JSON document per coordinate key
pub struct FileCache {
    cache_dir: PathBuf,
    /// Number of `*.json` entries, seeded by `init` and kept current by writes
    entries: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FileCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            entries: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Ensure the cache directory exists and count the entries already in it
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).await?;

        let mut entries = 0u64;
        let mut dir = fs::read_dir(&self.cache_dir).await?;
        while let Some(item) = dir.next_entry().await? {
            if is_entry_file(&item.path()) {
                entries += 1;
            }
        }
        self.entries.store(entries, Ordering::Relaxed);

        info!(cache_dir = ?self.cache_dir, entries, "Geocoder cache initialized");
        Ok(())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.cache_dir
            .join(format!("{}.json", hex::encode(hasher.finalize())))
    }

    async fn remove_entry(&self, path: &Path) {
        if fs::remove_file(path).await.is_ok() {
            let _ = self
                .entries
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        }
    }

    async fn read_entry(&self, path: &Path) -> Option<FileCacheEntry> {
        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read cached response");
                return None;
            }
        };

        match serde_json::from_slice(&data) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = ?path, error = %e, "Corrupt cache entry, removing");
                self.remove_entry(path).await;
                None
            }
        }
    }
}

impl GeocodeCache for FileCache {
    async fn get(&self, key: &str) -> Option<RawLocation> {
        let path = self.path_for(key);

        if let Some(entry) = self.read_entry(&path).await {
            if entry.expires_at > Utc::now() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Cache hit");
                return Some(entry.location);
            }
            debug!(key, created_at = %entry.created_at, "Cache entry expired");
            self.remove_entry(&path).await;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn put(&self, key: &str, value: RawLocation, ttl: Duration) -> Result<()> {
        let created_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let entry = FileCacheEntry {
            key: key.to_string(),
            created_at,
            expires_at: created_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            location: value,
        };

        fs::create_dir_all(&self.cache_dir).await?;
        let path = self.path_for(key);
        let existed = fs::try_exists(&path).await.unwrap_or(false);
        fs::write(&path, serde_json::to_vec(&entry)?).await?;
        if !existed {
            self.entries.fetch_add(1, Ordering::Relaxed);
        }
        debug!(key, "Cached response");
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<()> {
        let mut dir = match fs::read_dir(&self.cache_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0u64;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if is_entry_file(&path) {
                fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        self.entries.store(0, Ordering::Relaxed);

        info!(cache_dir = ?self.cache_dir, removed, "Geocoder cache purged");
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

fn is_entry_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
