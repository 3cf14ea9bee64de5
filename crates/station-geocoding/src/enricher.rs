//! Geohash and human readable names for stations

use std::collections::HashSet;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};

use nominatim_client::{GeocodeCache, NominatimClient, NominatimError, RawLocation};
use tracing::{debug, error, warn};

use crate::address::{rebundle, Location};
use crate::error::EnrichmentError;
use crate::format::format_address;
use crate::improve::{improve_location, ImproveRules};
use crate::station::{Station, StationId};

/// Source of raw reverse geocoding results
pub trait ReverseGeocoder {
    fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        country_hint: Option<&str>,
    ) -> impl Future<Output = Result<RawLocation, NominatimError>>;
}

impl<C: GeocodeCache> ReverseGeocoder for NominatimClient<C> {
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        country_hint: Option<&str>,
    ) -> Result<RawLocation, NominatimError> {
        NominatimClient::reverse_geocode(self, latitude, longitude, country_hint).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrichmentConfig {
    /// Resolve station names through the reverse geocoder
    pub reverse_geocode: bool,
    pub rules: ImproveRules,
}

/// Computes `position.geohash`, `name` and `location` for stations
///
/// Failures never propagate: a station whose lookup fails is still named,
/// using its id and country.
pub struct StationEnricher<G> {
    geocoder: G,
    config: EnrichmentConfig,
    /// Stations already reported for missing coordinates
    warned: HashSet<StationId>,
}

impl<G: ReverseGeocoder> StationEnricher<G> {
    pub fn new(geocoder: G, config: EnrichmentConfig) -> Self {
        Self {
            geocoder,
            config,
            warned: HashSet::new(),
        }
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    pub async fn enrich_station(&mut self, station: &mut Station) {
        match (station.position.latitude, station.position.longitude) {
            (Some(latitude), Some(longitude)) => {
                station.position.geohash = Some(geohash_codec::encode(latitude, longitude));

                if self.config.reverse_geocode {
                    if let Err(e) = self.resolve(station, latitude, longitude).await {
                        error!(
                            station_id = %station.station_id,
                            lat = latitude,
                            lon = longitude,
                            error = %e,
                            "Failed computing humanized name for station"
                        );
                    }
                }
            }
            _ => self.warn_incomplete_position(&station.station_id),
        }

        // A bare country is not a useful station label
        let country_only = match (&station.name, &station.position.country) {
            (Some(name), Some(country)) => name.to_lowercase() == country.to_lowercase(),
            _ => false,
        };
        if country_only {
            debug!(station_id = %station.station_id, "Discarding country-only name");
            station.name = None;
        }

        if station.name.is_none() {
            station.name = Some(fallback_name(station));
        }
    }

    async fn resolve(
        &self,
        station: &mut Station,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), EnrichmentError> {
        let raw = self
            .geocoder
            .reverse_geocode(latitude, longitude, station.position.country.as_deref())
            .await?;

        let location = rebundle(raw)?;
        let (location, name) = normalize(location, &self.config.rules)?;

        station.name = (!name.is_empty()).then_some(name);
        station.location = Some(location);
        Ok(())
    }

    fn warn_incomplete_position(&mut self, station_id: &StationId) {
        if self.warned.insert(station_id.clone()) {
            warn!(
                station_id = %station_id,
                "Incomplete station position, skipping geospatial enrichment"
            );
        }
    }
}

/// Improve and format a location, containing any panic from either step
fn normalize(
    mut location: Location,
    rules: &ImproveRules,
) -> Result<(Location, String), EnrichmentError> {
    let name = catch_unwind(AssertUnwindSafe(|| {
        improve_location(Some(&mut location), rules);
        format_address(&location)
    }))
    .map_err(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        EnrichmentError::Normalization(message)
    })?;
    Ok((location, name))
}

/// Label for stations without a usable geocoded name
pub fn fallback_name(station: &Station) -> String {
    match station.position.country.as_deref().map(str::trim) {
        Some(country) if !country.is_empty() => {
            format!("Station #{}, {}", station.station_id, country)
        }
        _ => format!("Station #{}", station.station_id),
    }
}
