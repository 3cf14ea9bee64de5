//! Writing enriched stations

use std::collections::HashSet;
use std::io::Write;

use serde_json::json;
use station_geocoding::{Station, StationId};

use crate::config::TargetFormat;
use crate::error::Result;

/// Stream target for enriched stations
///
/// The Grafana formats list each station id once, the first occurrence wins.
pub struct StationWriter<W: Write> {
    out: W,
    format: TargetFormat,
    entries: Vec<serde_json::Value>,
    seen: HashSet<StationId>,
}

impl<W: Write> StationWriter<W> {
    pub fn new(out: W, format: TargetFormat) -> Self {
        Self {
            out,
            format,
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn write(&mut self, station: &Station) -> Result<()> {
        if self.format == TargetFormat::Json {
            serde_json::to_writer(&mut self.out, station)?;
            self.out.write_all(b"\n")?;
            return Ok(());
        }

        if !self.seen.insert(station.station_id.clone()) {
            return Ok(());
        }

        let id = station.station_id.to_string();
        let name = station.name.as_deref().unwrap_or_default();
        let entry = match self.format {
            TargetFormat::GrafanaKn => json!({"key": id, "name": name}),
            _ => json!({"value": id, "text": name}),
        };
        self.entries.push(entry);
        Ok(())
    }

    /// Flush buffered output and hand back the writer
    pub fn finish(mut self) -> Result<W> {
        if self.format != TargetFormat::Json {
            serde_json::to_writer_pretty(&mut self.out, &self.entries)?;
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;
        Ok(self.out)
    }
}
