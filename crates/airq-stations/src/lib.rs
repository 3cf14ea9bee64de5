//! Air quality station enrichment pump
//!
//! Reads a station list, adds a geohash and a human readable name to every
//! station and writes the result as JSON lines or Grafana variable entries.

pub mod config;
pub mod error;
pub mod pump;
pub mod source;
pub mod target;

pub use config::{CacheBackend, Cli, TargetFormat};
pub use error::{AppError, Result};
pub use pump::{run, PumpSummary};
