//! Station geocoding
//!
//! Turns raw reverse geocoding responses into a curated [`Location`] and a
//! short display name for air quality stations:
//!
//! 1. [`rebundle`] splits the provider's address into known and extra fields.
//! 2. [`improve_location`] fills gaps and fixes known upstream anomalies.
//! 3. [`format_address`] renders the label.
//!
//! [`StationEnricher`] runs these steps per station and never lets a
//! failure escape into the surrounding batch.

pub mod address;
pub mod enricher;
pub mod error;
pub mod format;
pub mod improve;
pub mod station;

pub use address::{rebundle, Address, Location, ADDRESS_FIELDS};
pub use enricher::{fallback_name, EnrichmentConfig, ReverseGeocoder, StationEnricher};
pub use error::{EnrichmentError, RebundleError};
pub use format::format_address;
pub use geohash_codec::{decode as decode_geohash, encode as encode_geohash};
pub use improve::{improve_location, ImproveRules, UNKNOWN};
pub use station::{Id, Position, SensorId, SensorRef, Station, StationId};
