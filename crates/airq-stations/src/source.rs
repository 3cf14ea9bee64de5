//! Reading station lists

use std::io::Read;

use station_geocoding::Station;
use tracing::info;

use crate::error::Result;

/// Read stations from a path, a `file://` URL or `-` for stdin
pub fn read_stations(source: &str) -> Result<Vec<Station>> {
    let data = if source == "-" {
        let mut data = String::new();
        std::io::stdin().read_to_string(&mut data)?;
        data
    } else {
        let path = source.strip_prefix("file://").unwrap_or(source);
        std::fs::read_to_string(path)?
    };

    let stations = parse_stations(&data)?;
    info!(source, count = stations.len(), "Read stations");
    Ok(stations)
}

/// Parse either a JSON array of stations or one station document per line
pub fn parse_stations(data: &str) -> Result<Vec<Station>> {
    if data.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(data)?);
    }

    let mut stations = Vec::new();
    for line in data.lines().map(str::trim).filter(|line| !line.is_empty()) {
        stations.push(serde_json::from_str(line)?);
    }
    Ok(stations)
}

/// Station and sensor id selection, an empty list matches everything
#[derive(Debug, Clone, Default)]
pub struct StationFilter {
    pub stations: Vec<String>,
    pub sensors: Vec<String>,
}

impl StationFilter {
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty() && self.sensors.is_empty()
    }

    /// Both lists must match when both are given
    pub fn matches(&self, station: &Station) -> bool {
        let station_ok =
            self.stations.is_empty() || self.stations.contains(&station.station_id.to_string());
        let sensor_ok = self.sensors.is_empty()
            || station
                .sensors
                .iter()
                .any(|sensor| self.sensors.contains(&sensor.sensor_id.to_string()));
        station_ok && sensor_ok
    }
}

pub fn apply_filter(stations: Vec<Station>, filter: &StationFilter) -> Vec<Station> {
    if filter.is_empty() {
        return stations;
    }
    stations
        .into_iter()
        .filter(|station| filter.matches(station))
        .collect()
}
