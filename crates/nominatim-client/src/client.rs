use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, GeocodeCache};
use crate::error::NominatimError;
use crate::types::{CachePolicy, NominatimConfig, RawLocation};

/// Address keys that on their own carry no useful location information
const DEGENERATE_KEYS: [&str; 3] = ["country", "country_code", "continent"];

/// Nominatim reverse geocoding client with regional mirrors, fair-use
/// throttling and an injected response cache
pub struct NominatimClient<C> {
    client: reqwest::Client,
    config: NominatimConfig,
    cache: C,
    /// When the fallback endpoint was last asked
    last_fallback_request: Mutex<Option<Instant>>,
}

impl<C: GeocodeCache> NominatimClient<C> {
    pub fn new(config: NominatimConfig, cache: C) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            config,
            cache,
            last_fallback_request: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &NominatimConfig {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Reverse geocode coordinates into the raw provider response
    ///
    /// A regional mirror matching `country_hint` is asked first. The public
    /// endpoint is used when there is no such mirror, when the mirror fails,
    /// or when it only knows the country.
    pub async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        country_hint: Option<&str>,
    ) -> crate::Result<RawLocation> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(NominatimError::InvalidCoordinates(latitude, longitude));
        }

        let key = cache_key(latitude, longitude);

        if self.config.cache_policy == CachePolicy::Use {
            if let Some(cached) = self.cache.get(&key).await {
                debug!(lat = latitude, lon = longitude, "Geocoder cache hit");
                return Ok(cached);
            }
        }

        info!(lat = latitude, lon = longitude, "Reverse geocoding");

        if let Some(mirror) = self.config.mirror_for(country_hint) {
            match self.fetch(mirror, latitude, longitude).await {
                Ok(location) if !is_degenerate(&location) => {
                    return Ok(self.store(key, location).await);
                }
                Ok(_) => {
                    debug!(
                        mirror,
                        lat = latitude,
                        lon = longitude,
                        "Mirror returned country-level result only, falling back"
                    );
                }
                Err(e) => {
                    warn!(mirror, lat = latitude, lon = longitude, error = %e, "Mirror failed, falling back");
                }
            }
        }

        self.throttle().await;

        match self.fetch(&self.config.base_url, latitude, longitude).await {
            Ok(location) => Ok(self.store(key, location).await),
            Err(e) => {
                warn!(lat = latitude, lon = longitude, error = %e, "Reverse geocoding failed");
                Err(NominatimError::Exhausted(Box::new(e)))
            }
        }
    }

    /// Reverse geocode the centre of a geohash cell
    pub async fn reverse_geocode_geohash(
        &self,
        geohash: &str,
        country_hint: Option<&str>,
    ) -> crate::Result<RawLocation> {
        let position = geohash_codec::decode(geohash)?;
        self.reverse_geocode(position.latitude, position.longitude, country_hint)
            .await
    }

    async fn store(&self, key: String, location: RawLocation) -> RawLocation {
        if self.config.cache_policy == CachePolicy::Use {
            if let Err(e) = self
                .cache
                .put(&key, location.clone(), self.config.cache_ttl)
                .await
            {
                warn!(key = %key, error = %e, "Failed to cache geocoder response");
            }
        }
        location
    }

    async fn fetch(
        &self,
        base_url: &str,
        latitude: f64,
        longitude: f64,
    ) -> crate::Result<RawLocation> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=jsonv2&addressdetails=1&zoom=18",
            base_url.trim_end_matches('/'),
            latitude,
            longitude
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NominatimError::Status(response.status()));
        }

        let body = response.text().await?;
        let location: RawLocation = serde_json::from_str(&body)?;

        if let Some(err) = location.get("error") {
            let message = err
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            return Err(NominatimError::ApiError(message));
        }

        Ok(location)
    }

    /// Obey the fair use policy of the public endpoint (max. 1 request per second)
    async fn throttle(&self) {
        let mut last = self.last_fallback_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.min_request_interval {
                tokio::time::sleep(self.config.min_request_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Whether a response only identifies the country and nothing below it
pub fn is_degenerate(location: &RawLocation) -> bool {
    match location.get("address").and_then(|a| a.as_object()) {
        Some(address) => address
            .keys()
            .all(|key| DEGENERATE_KEYS.contains(&key.as_str())),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use serde_json::json;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn raw(value: serde_json::Value) -> RawLocation {
        value.as_object().cloned().unwrap()
    }

    /// Local HTTP endpoint answering every request with the same JSON body
    struct CannedServer {
        url: String,
        requests: Arc<StdMutex<Vec<String>>>,
    }

    impl CannedServer {
        async fn start(body: serde_json::Value) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(StdMutex::new(Vec::new()));
            let seen = requests.clone();
            let body = body.to_string();

            tokio::spawn(async move {
                loop {
                    let Ok((mut socket, _)) = listener.accept().await else {
                        return;
                    };
                    let mut head = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => head.extend_from_slice(&buf[..n]),
                        }
                    }
                    seen.lock()
                        .unwrap()
                        .push(String::from_utf8_lossy(&head).to_lowercase());

                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });

            Self { url, requests }
        }

        fn hits(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, index: usize) -> String {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    fn local_config(fallback: &CannedServer) -> NominatimConfig {
        NominatimConfig {
            base_url: fallback.url.clone(),
            timeout: Duration::from_secs(5),
            min_request_interval: Duration::ZERO,
            ..NominatimConfig::default()
        }
    }

    fn stuttgart() -> serde_json::Value {
        json!({
            "display_name": "Ulmer Straße, Wangen, Stuttgart",
            "address": {"road": "Ulmer Straße", "suburb": "Wangen", "city": "Stuttgart", "country_code": "de"}
        })
    }

    fn unreachable_config() -> NominatimConfig {
        NominatimConfig {
            // Nothing listens on the discard port
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            ..NominatimConfig::default()
        }
    }

    #[test]
    fn test_country_only_result_is_degenerate() {
        let location = raw(json!({
            "display_name": "Deutschland",
            "address": {"country": "Deutschland", "country_code": "de", "continent": "Europe"}
        }));
        assert!(is_degenerate(&location));
    }

    #[test]
    fn test_missing_or_empty_address_is_degenerate() {
        assert!(is_degenerate(&raw(json!({"display_name": "x"}))));
        assert!(is_degenerate(&raw(json!({"address": {}}))));
    }

    #[test]
    fn test_detailed_result_is_not_degenerate() {
        let location = raw(json!({
            "address": {"city": "Stuttgart", "country": "Deutschland", "country_code": "de"}
        }));
        assert!(!is_degenerate(&location));
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected() {
        let client = NominatimClient::new(unreachable_config(), MemoryCache::new()).unwrap();
        let err = client.reverse_geocode(91.0, 0.0, None).await.unwrap_err();
        assert!(matches!(err, NominatimError::InvalidCoordinates(_, _)));
    }

    #[tokio::test]
    async fn test_invalid_geohash_rejected() {
        let client = NominatimClient::new(unreachable_config(), MemoryCache::new()).unwrap();
        let err = client
            .reverse_geocode_geohash("not-a-hash", None)
            .await
            .unwrap_err();
        assert!(matches!(err, NominatimError::InvalidGeohash(_)));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let cache = MemoryCache::new();
        let location = raw(json!({"address": {"city": "Bremen", "state": "Bremen"}}));
        cache
            .put(&cache_key(53.112, 8.896), location.clone(), Duration::from_secs(60))
            .await
            .unwrap();

        let client = NominatimClient::new(unreachable_config(), cache).unwrap();
        let result = client.reverse_geocode(53.112, 8.896, None).await.unwrap();
        assert_eq!(result, location);
    }

    #[tokio::test]
    async fn test_bypass_ignores_cache() {
        let cache = MemoryCache::new();
        cache
            .put(
                &cache_key(53.112, 8.896),
                raw(json!({"address": {"city": "Bremen"}})),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let config = NominatimConfig {
            cache_policy: CachePolicy::Bypass,
            ..unreachable_config()
        };
        let client = NominatimClient::new(config, cache).unwrap();
        let err = client.reverse_geocode(53.112, 8.896, None).await.unwrap_err();
        assert!(matches!(err, NominatimError::Exhausted(_)));
    }

    #[tokio::test]
    async fn test_failing_mirror_and_fallback_exhausts() {
        let config = unreachable_config().with_mirror("DE", "http://127.0.0.1:9/mirror");
        let client = NominatimClient::new(config, MemoryCache::new()).unwrap();

        let err = client
            .reverse_geocode(48.778, 9.236, Some("de"))
            .await
            .unwrap_err();
        assert!(matches!(err, NominatimError::Exhausted(_)));
        assert_eq!(client.cache().stats().entries, 0);
    }

    #[tokio::test]
    async fn test_mirror_answers_for_matching_country() {
        let mirror = CannedServer::start(stuttgart()).await;
        let fallback = CannedServer::start(json!({"address": {"city": "Elsewhere"}})).await;
        let config = local_config(&fallback).with_mirror("DE", &mirror.url);
        let client = NominatimClient::new(config, MemoryCache::new()).unwrap();

        let result = client.reverse_geocode(48.778, 9.236, Some("de")).await.unwrap();
        assert_eq!(result, raw(stuttgart()));
        assert_eq!(mirror.hits(), 1);
        assert_eq!(fallback.hits(), 0);

        // Served from the cache the second time
        let again = client.reverse_geocode(48.778, 9.236, Some("de")).await.unwrap();
        assert_eq!(again, result);
        assert_eq!(mirror.hits(), 1);
    }

    #[tokio::test]
    async fn test_other_country_skips_mirror() {
        let mirror = CannedServer::start(json!({"address": {"city": "Wien"}})).await;
        let fallback = CannedServer::start(stuttgart()).await;
        let config = local_config(&fallback).with_mirror("AT", &mirror.url);
        let client = NominatimClient::new(config, MemoryCache::new()).unwrap();

        let result = client.reverse_geocode(48.778, 9.236, Some("DE")).await.unwrap();
        assert_eq!(result, raw(stuttgart()));
        assert_eq!(mirror.hits(), 0);
        assert_eq!(fallback.hits(), 1);
    }

    #[tokio::test]
    async fn test_degenerate_mirror_result_falls_back() {
        let mirror = CannedServer::start(json!({
            "address": {"country": "Deutschland", "country_code": "de"}
        }))
        .await;
        let fallback = CannedServer::start(json!({"address": {"city": "Stuttgart"}})).await;
        let config = local_config(&fallback).with_mirror("DE", &mirror.url);
        let client = NominatimClient::new(config, MemoryCache::new()).unwrap();

        let result = client.reverse_geocode(48.778, 9.236, Some("DE")).await.unwrap();
        assert_eq!(result, raw(json!({"address": {"city": "Stuttgart"}})));
        assert_eq!(mirror.hits(), 1);
        assert_eq!(fallback.hits(), 1);

        client.reverse_geocode(48.778, 9.236, Some("DE")).await.unwrap();
        assert_eq!(mirror.hits(), 1);
        assert_eq!(fallback.hits(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_query_and_user_agent() {
        let fallback = CannedServer::start(stuttgart()).await;
        let config = NominatimConfig {
            user_agent: "airq-test/1.0".to_string(),
            ..local_config(&fallback)
        };
        let client = NominatimClient::new(config, MemoryCache::new()).unwrap();

        client.reverse_geocode(48.778, 9.236, None).await.unwrap();

        let request = fallback.request(0);
        assert!(request.starts_with(
            "get /reverse?lat=48.778&lon=9.236&format=jsonv2&addressdetails=1&zoom=18 http/1.1"
        ));
        assert!(request.contains("user-agent: airq-test/1.0"));
        assert!(request.contains("accept: application/json"));
    }

    #[tokio::test]
    async fn test_successful_response_is_cached() {
        let fallback = CannedServer::start(stuttgart()).await;
        let client = NominatimClient::new(local_config(&fallback), MemoryCache::new()).unwrap();

        client.reverse_geocode(48.778, 9.236, None).await.unwrap();
        let cached = client.cache().get(&cache_key(48.778, 9.236)).await;
        assert_eq!(cached, Some(raw(stuttgart())));
    }

    #[tokio::test]
    async fn test_api_error_is_not_cached() {
        let fallback = CannedServer::start(json!({"error": "Unable to geocode"})).await;
        let client = NominatimClient::new(local_config(&fallback), MemoryCache::new()).unwrap();

        let err = client.reverse_geocode(0.0, -30.0, None).await.unwrap_err();
        match err {
            NominatimError::Exhausted(inner) => {
                assert!(matches!(*inner, NominatimError::ApiError(ref msg) if msg == "Unable to geocode"))
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(client.reverse_geocode(0.0, -30.0, None).await.is_err());
        assert_eq!(fallback.hits(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_spaces_requests() {
        let client = NominatimClient::new(unreachable_config(), MemoryCache::new()).unwrap();

        let start = Instant::now();
        client.throttle().await;
        client.throttle().await;
        client.throttle().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
