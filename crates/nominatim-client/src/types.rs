use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level reverse geocoding response as returned by Nominatim
///
/// The shape varies by country and provider, so it is kept as a JSON object.
/// Address details live in its `address` member.
pub type RawLocation = serde_json::Map<String, serde_json::Value>;

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("nominatim-client-rs/", env!("CARGO_PKG_VERSION"));

/// Addresses rarely change, keep responses for three months
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30 * 3);

/// How the response cache is used for the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Serve hits from the cache and store fresh responses
    #[default]
    Use,
    /// Neither read nor write the cache
    Bypass,
}

/// Client settings
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Public fallback endpoint
    pub base_url: String,
    /// Regional mirrors keyed by upper-case ISO country code
    pub mirrors: HashMap<String, String>,
    pub user_agent: String,
    pub timeout: Duration,
    /// Minimum spacing between requests to the fallback endpoint
    pub min_request_interval: Duration,
    pub cache_ttl: Duration,
    pub cache_policy: CachePolicy,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            mirrors: HashMap::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            min_request_interval: Duration::from_secs(1),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_policy: CachePolicy::Use,
        }
    }
}

impl NominatimConfig {
    /// Register a regional mirror for a country code
    pub fn with_mirror(mut self, country_code: &str, base_url: &str) -> Self {
        self.mirrors
            .insert(country_code.to_uppercase(), base_url.to_string());
        self
    }

    /// Mirror to try first for the given country hint
    pub fn mirror_for(&self, country_hint: Option<&str>) -> Option<&str> {
        let code = country_hint?.trim().to_uppercase();
        self.mirrors.get(&code).map(String::as_str)
    }
}

/// Statistics about a response cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
}
