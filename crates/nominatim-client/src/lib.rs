//! Nominatim Reverse Geocoding Client
//!
//! A Rust client for the [Nominatim](https://nominatim.org/) reverse geocoding API.
//! Lookups try a regional mirror first when one is configured for the
//! caller's country hint, then the public endpoint, which is throttled to
//! one request per second as its usage policy demands. Successful responses
//! are kept in an injected [`GeocodeCache`], either in memory (moka) or on
//! disk.

mod cache;
mod client;
mod error;
mod file_cache;
mod types;

pub use cache::{cache_key, GeocodeCache, MemoryCache};
pub use client::{is_degenerate, NominatimClient};
pub use error::{NominatimError, Result};
pub use file_cache::{FileCache, FileCacheEntry};
pub use types::{
    CachePolicy, CacheStats, NominatimConfig, RawLocation, DEFAULT_BASE_URL, DEFAULT_CACHE_TTL,
    DEFAULT_USER_AGENT,
};
