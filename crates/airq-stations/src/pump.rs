//! Read, enrich and write a station list

use std::io::Write;
use std::time::Instant;

use nominatim_client::{GeocodeCache, NominatimClient};
use station_geocoding::StationEnricher;
use tracing::{info, warn};

use crate::config::Cli;
use crate::error::Result;
use crate::source::{apply_filter, read_stations, StationFilter};
use crate::target::StationWriter;

/// Stations between two progress reports
const PROGRESS_INTERVAL: usize = 100;

/// Outcome of one pump run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpSummary {
    pub stations: usize,
    /// Stations carrying a location from the geocoder
    pub geocoded: usize,
}

pub async fn run<C: GeocodeCache, W: Write>(cli: &Cli, cache: C, out: W) -> Result<PumpSummary> {
    if cli.purge_nominatim_cache {
        info!("Purging Nominatim cache");
        cache.invalidate_all().await?;
    }

    let filter = StationFilter {
        stations: cli.station.clone(),
        sensors: cli.sensor.clone(),
    };
    let stations = apply_filter(read_stations(&cli.source)?, &filter);
    if !filter.is_empty() && stations.is_empty() {
        warn!(?filter, "No station matches the filter");
    }

    let client = NominatimClient::new(cli.nominatim_config(), cache)?;
    let mut enricher = StationEnricher::new(client, cli.enrichment_config());
    let mut writer = StationWriter::new(out, cli.target);

    let started = Instant::now();
    let total = stations.len();
    let mut summary = PumpSummary::default();

    for mut station in stations {
        enricher.enrich_station(&mut station).await;
        writer.write(&station)?;

        summary.stations += 1;
        if station.location.is_some() {
            summary.geocoded += 1;
        }
        if summary.stations % PROGRESS_INTERVAL == 0 {
            info!(processed = summary.stations, total, "Enriching stations");
        }
    }
    writer.finish()?;

    let stats = enricher.geocoder().cache().stats();
    info!(
        stations = summary.stations,
        geocoded = summary.geocoded,
        cache_entries = stats.entries,
        cache_hits = stats.hits,
        cache_misses = stats.misses,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Finished enriching stations"
    );

    Ok(summary)
}
