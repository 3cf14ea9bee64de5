//! Error types for the station pump

use std::fmt;

use nominatim_client::NominatimError;

#[derive(Debug)]
pub enum AppError {
    Config(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Geocoder(NominatimError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Json(err) => write!(f, "JSON error: {}", err),
            AppError::Geocoder(err) => write!(f, "Geocoder error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Geocoder(err) => Some(err),
            AppError::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Json(err)
    }
}

impl From<NominatimError> for AppError {
    fn from(err: NominatimError) -> Self {
        AppError::Geocoder(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for AppError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = AppError::Config("invalid mirror".to_string());
        assert_eq!(format!("{}", err), "Configuration error: invalid mirror");
    }

    #[test]
    fn test_io_error_from() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(format!("{}", err), "I/O error: gone");
    }

    #[test]
    fn test_error_is_debug() {
        let err = AppError::Config("x".to_string());
        assert!(format!("{:?}", err).contains("Config"));
    }
}
