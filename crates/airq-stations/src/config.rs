//! Command line and environment configuration

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use nominatim_client::{CachePolicy, NominatimConfig, DEFAULT_BASE_URL};
use station_geocoding::{EnrichmentConfig, ImproveRules};

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    /// JSON files below the cache directory, kept across runs
    File,
    /// In-process only
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetFormat {
    /// One station document per line
    Json,
    /// Grafana variable entries (`value`/`text`)
    Grafana,
    /// Grafana Worldmap Panel mapping (`key`/`name`)
    #[value(name = "grafana-kn")]
    GrafanaKn,
}

/// Enrich air quality stations with geohashes and human readable names
#[derive(Parser, Debug, Clone)]
#[command(name = "airq-stations", version)]
pub struct Cli {
    /// Station list (JSON array or one JSON document per line), `-` for stdin
    #[arg(long, default_value = "-", env = "AIRQ_SOURCE")]
    pub source: String,

    /// Compute station names using the Nominatim reverse geocoder
    #[arg(long, env = "AIRQ_REVERSE_GEOCODE")]
    pub reverse_geocode: bool,

    /// Neither read nor write the geocoder cache for this run
    #[arg(long, env = "AIRQ_DISABLE_NOMINATIM_CACHE")]
    pub disable_nominatim_cache: bool,

    /// Drop all cached geocoder responses before starting
    #[arg(long)]
    pub purge_nominatim_cache: bool,

    /// Public Nominatim endpoint
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "AIRQ_NOMINATIM_URL")]
    pub nominatim_url: String,

    /// Regional Nominatim mirror tried first for stations in that country
    #[arg(long = "nominatim-mirror", value_name = "CC=URL", value_parser = parse_mirror)]
    pub nominatim_mirrors: Vec<(String, String)>,

    #[arg(long, value_enum, default_value_t = CacheBackend::File, env = "AIRQ_CACHE_BACKEND")]
    pub cache_backend: CacheBackend,

    /// Directory of the file cache, defaults to the user cache directory
    #[arg(long, env = "AIRQ_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = TargetFormat::Json, env = "AIRQ_TARGET")]
    pub target: TargetFormat,

    /// Only process these station ids
    #[arg(long, value_delimiter = ',')]
    pub station: Vec<String>,

    /// Only process stations carrying one of these sensor ids
    #[arg(long, value_delimiter = ',')]
    pub sensor: Vec<String>,

    /// Enable debug logging
    #[arg(long, env = "AIRQ_DEBUG")]
    pub debug: bool,
}

impl Cli {
    pub fn nominatim_config(&self) -> NominatimConfig {
        let cache_policy = if self.disable_nominatim_cache {
            CachePolicy::Bypass
        } else {
            CachePolicy::Use
        };

        let mut config = NominatimConfig {
            base_url: self.nominatim_url.clone(),
            user_agent: USER_AGENT.to_string(),
            cache_policy,
            ..NominatimConfig::default()
        };
        for (country_code, url) in &self.nominatim_mirrors {
            config = config.with_mirror(country_code, url);
        }
        config
    }

    pub fn enrichment_config(&self) -> EnrichmentConfig {
        EnrichmentConfig {
            reverse_geocode: self.reverse_geocode,
            rules: ImproveRules::default(),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("airq-stations")
                .join("nominatim")
        })
    }
}

fn parse_mirror(value: &str) -> Result<(String, String), String> {
    let (code, url) = value
        .split_once('=')
        .ok_or_else(|| format!("expected CC=URL, got {value:?}"))?;
    let code = code.trim();
    let url = url.trim();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(format!("invalid country code {code:?}"));
    }
    if url.is_empty() {
        return Err("mirror URL is empty".to_string());
    }
    Ok((code.to_uppercase(), url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["airq-stations"]).unwrap();
        assert_eq!(cli.source, "-");
        assert!(!cli.reverse_geocode);
        assert_eq!(cli.cache_backend, CacheBackend::File);
        assert_eq!(cli.target, TargetFormat::Json);

        let config = cli.nominatim_config();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.cache_policy, CachePolicy::Use);
        assert!(config.user_agent.starts_with("airq-stations/"));
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "airq-stations",
            "--reverse-geocode",
            "--disable-nominatim-cache",
            "--nominatim-mirror",
            "de=https://nominatim.example.de",
            "--station",
            "28,1071",
            "--sensor",
            "657,2130",
            "--target",
            "grafana",
        ])
        .unwrap();

        assert!(cli.enrichment_config().reverse_geocode);
        assert_eq!(cli.station, vec!["28", "1071"]);
        assert_eq!(cli.sensor, vec!["657", "2130"]);
        assert_eq!(cli.target, TargetFormat::Grafana);

        let config = cli.nominatim_config();
        assert_eq!(config.cache_policy, CachePolicy::Bypass);
        assert_eq!(
            config.mirror_for(Some("DE")),
            Some("https://nominatim.example.de")
        );
    }

    #[test]
    fn test_key_name_target() {
        let cli = Cli::try_parse_from(["airq-stations", "--target", "grafana-kn"]).unwrap();
        assert_eq!(cli.target, TargetFormat::GrafanaKn);
    }

    #[test]
    fn test_parse_mirror() {
        assert_eq!(
            parse_mirror("at = https://nominatim.example.at").unwrap(),
            ("AT".to_string(), "https://nominatim.example.at".to_string())
        );
        assert!(parse_mirror("https://nominatim.example.at").is_err());
        assert!(parse_mirror("AUT=https://x").is_err());
        assert!(parse_mirror("AT=").is_err());
    }

    #[test]
    fn test_explicit_cache_dir() {
        let cli = Cli::try_parse_from(["airq-stations", "--cache-dir", "/tmp/airq"]).unwrap();
        assert_eq!(cli.cache_dir(), PathBuf::from("/tmp/airq"));
    }
}
