//! airq-stations - enrich air quality stations with geohashes and names

use airq_stations::{run, CacheBackend, Cli, Result};
use clap::Parser;
use nominatim_client::{FileCache, MemoryCache};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::from_default_env().add_directive(format!("airq_stations={level}").parse()?);
    let env_filter = env_filter
        .add_directive(format!("station_geocoding={level}").parse()?)
        .add_directive(format!("nominatim_client={level}").parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let stdout = std::io::stdout().lock();
    let summary = match cli.cache_backend {
        CacheBackend::File => {
            let cache = FileCache::new(cli.cache_dir());
            cache.init().await?;
            info!(dir = %cache.cache_dir().display(), "Using file cache");
            run(&cli, cache, stdout).await?
        }
        CacheBackend::Memory => run(&cli, MemoryCache::new(), stdout).await?,
    };

    info!(stations = summary.stations, "Done");
    Ok(())
}
