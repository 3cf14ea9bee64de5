//! Error types for station geocoding

use std::fmt;

use nominatim_client::NominatimError;

/// The geocoder response did not have the expected structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebundleError {
    MalformedResponse(String),
}

impl fmt::Display for RebundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebundleError::MalformedResponse(msg) => {
                write!(f, "Malformed geocoder response: {}", msg)
            }
        }
    }
}

impl std::error::Error for RebundleError {}

/// Failures while computing a station's location and name
///
/// These never leave the enricher, they are logged and the station falls
/// back to a synthesized name.
#[derive(Debug)]
pub enum EnrichmentError {
    Geocoding(NominatimError),
    Rebundle(RebundleError),
    Normalization(String),
}

impl fmt::Display for EnrichmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichmentError::Geocoding(err) => write!(f, "Geocoding error: {}", err),
            EnrichmentError::Rebundle(err) => write!(f, "{}", err),
            EnrichmentError::Normalization(msg) => {
                write!(f, "Address normalization failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for EnrichmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EnrichmentError::Geocoding(err) => Some(err),
            EnrichmentError::Rebundle(err) => Some(err),
            EnrichmentError::Normalization(_) => None,
        }
    }
}

impl From<NominatimError> for EnrichmentError {
    fn from(err: NominatimError) -> Self {
        EnrichmentError::Geocoding(err)
    }
}

impl From<RebundleError> for EnrichmentError {
    fn from(err: RebundleError) -> Self {
        EnrichmentError::Rebundle(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_response_display() {
        let err = RebundleError::MalformedResponse("missing address".to_string());
        assert_eq!(
            format!("{}", err),
            "Malformed geocoder response: missing address"
        );
    }

    #[test]
    fn test_enrichment_error_wraps_rebundle() {
        let err: EnrichmentError =
            RebundleError::MalformedResponse("missing address".to_string()).into();
        assert_eq!(
            format!("{}", err),
            "Malformed geocoder response: missing address"
        );
    }

    #[test]
    fn test_normalization_error_display() {
        let err = EnrichmentError::Normalization("panicked".to_string());
        assert_eq!(format!("{}", err), "Address normalization failed: panicked");
    }
}
