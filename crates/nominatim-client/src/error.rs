use std::fmt;

use geohash_codec::GeoTagError;

/// Errors from the Nominatim client
#[derive(Debug)]
pub enum NominatimError {
    InvalidCoordinates(f64, f64),
    InvalidGeohash(GeoTagError),
    Http(reqwest::Error),
    Status(reqwest::StatusCode),
    ApiError(String),
    Decode(serde_json::Error),
    Cache(std::io::Error),
    /// Every configured provider failed; carries the last failure
    Exhausted(Box<NominatimError>),
}

impl fmt::Display for NominatimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCoordinates(lat, lng) => {
                write!(f, "Invalid coordinates: {lat}, {lng}")
            }
            Self::InvalidGeohash(e) => write!(f, "{e}"),
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Status(status) => write!(f, "Nominatim returned status {status}"),
            Self::ApiError(msg) => write!(f, "API error: {msg}"),
            Self::Decode(e) => write!(f, "Invalid Nominatim response: {e}"),
            Self::Cache(e) => write!(f, "Cache error: {e}"),
            Self::Exhausted(last) => {
                write!(f, "All geocoding providers failed, last error: {last}")
            }
        }
    }
}

impl std::error::Error for NominatimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidGeohash(e) => Some(e),
            Self::Http(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::Cache(e) => Some(e),
            Self::Exhausted(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NominatimError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl From<serde_json::Error> for NominatimError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err)
    }
}

impl From<std::io::Error> for NominatimError {
    fn from(err: std::io::Error) -> Self {
        Self::Cache(err)
    }
}

impl From<GeoTagError> for NominatimError {
    fn from(err: GeoTagError) -> Self {
        Self::InvalidGeohash(err)
    }
}

pub type Result<T> = std::result::Result<T, NominatimError>;
