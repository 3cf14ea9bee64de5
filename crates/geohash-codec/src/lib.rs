//! Geohash codec for station positions
//!
//! Encodes a latitude/longitude pair into the compact base-32 tag described at
//! <https://en.wikipedia.org/wiki/Geohash> and decodes tags back into the
//! centre of their cell.

use std::fmt;

/// Number of characters produced by [`encode`]
pub const PRECISION: usize = 11;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// A decoded position (centre of a geohash cell)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// The rectangle covered by a geohash
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl Bounds {
    pub fn center(&self) -> Position {
        Position {
            latitude: (self.min_latitude + self.max_latitude) / 2.0,
            longitude: (self.min_longitude + self.max_longitude) / 2.0,
        }
    }

    /// Half the cell height and width, i.e. the worst-case decode error
    pub fn error(&self) -> (f64, f64) {
        (
            (self.max_latitude - self.min_latitude) / 2.0,
            (self.max_longitude - self.min_longitude) / 2.0,
        )
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&latitude)
            && (self.min_longitude..=self.max_longitude).contains(&longitude)
    }
}

/// Errors from decoding a geohash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoTagError {
    InvalidTag(String),
}

impl fmt::Display for GeoTagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTag(tag) => write!(f, "Invalid geohash: {tag:?}"),
        }
    }
}

impl std::error::Error for GeoTagError {}

pub type Result<T> = std::result::Result<T, GeoTagError>;

/// Encode a position with the default precision of [`PRECISION`] characters
pub fn encode(latitude: f64, longitude: f64) -> String {
    encode_with_precision(latitude, longitude, PRECISION)
}

/// Encode a position into a geohash of `precision` characters
///
/// Coordinates outside the valid range are clamped to it.
pub fn encode_with_precision(latitude: f64, longitude: f64, precision: usize) -> String {
    let latitude = latitude.clamp(-90.0, 90.0);
    let longitude = longitude.clamp(-180.0, 180.0);

    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lon_range = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);
    let mut even = true;
    let mut bits = 0u8;
    let mut bit = 0;

    while hash.len() < precision {
        let (range, value) = if even {
            (&mut lon_range, longitude)
        } else {
            (&mut lat_range, latitude)
        };
        let mid = (range.0 + range.1) / 2.0;
        bits <<= 1;
        if value >= mid {
            bits |= 1;
            range.0 = mid;
        } else {
            range.1 = mid;
        }
        even = !even;

        bit += 1;
        if bit == 5 {
            hash.push(BASE32[bits as usize] as char);
            bits = 0;
            bit = 0;
        }
    }

    hash
}

/// Decode a geohash into the cell it covers
pub fn decode_bounds(tag: &str) -> Result<Bounds> {
    if tag.is_empty() {
        return Err(GeoTagError::InvalidTag(tag.to_string()));
    }

    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lon_range = (-180.0_f64, 180.0_f64);
    let mut even = true;

    for c in tag.chars() {
        let lower = c.to_ascii_lowercase();
        let idx = BASE32
            .iter()
            .position(|&b| b as char == lower)
            .ok_or_else(|| GeoTagError::InvalidTag(tag.to_string()))?;

        for shift in (0..5).rev() {
            let range = if even { &mut lon_range } else { &mut lat_range };
            let mid = (range.0 + range.1) / 2.0;
            if (idx >> shift) & 1 == 1 {
                range.0 = mid;
            } else {
                range.1 = mid;
            }
            even = !even;
        }
    }

    Ok(Bounds {
        min_latitude: lat_range.0,
        max_latitude: lat_range.1,
        min_longitude: lon_range.0,
        max_longitude: lon_range.1,
    })
}

/// Decode a geohash into the centre of its cell
pub fn decode(tag: &str) -> Result<Position> {
    decode_bounds(tag).map(|bounds| bounds.center())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_value() {
        // Reference value from the geohash wikipedia article
        assert_eq!(encode_with_precision(57.64911, 10.40744, 11), "u4pruydqqvj");
    }

    #[test]
    fn test_encode_default_precision() {
        let hash = encode(48.778, 9.236);
        assert_eq!(hash.len(), PRECISION);
        assert!(hash.starts_with("u0wt"));
    }

    #[test]
    fn test_roundtrip_within_cell() {
        let positions = [
            (48.778, 9.236),
            (52.544, 13.374),
            (-33.8688, 151.2093),
            (19.806, -70.704),
            (0.0, 0.0),
            (89.9999, -179.9999),
        ];
        for (lat, lon) in positions {
            let tag = encode(lat, lon);
            let bounds = decode_bounds(&tag).unwrap();
            assert!(bounds.contains(lat, lon), "{tag} does not cover {lat},{lon}");

            let decoded = decode(&tag).unwrap();
            let (lat_err, lon_err) = bounds.error();
            assert!((decoded.latitude - lat).abs() <= lat_err);
            assert!((decoded.longitude - lon).abs() <= lon_err);
        }
    }

    #[test]
    fn test_decode_is_case_insensitive() {
        assert_eq!(decode("U0WT6PV2").unwrap(), decode("u0wt6pv2").unwrap());
    }

    #[test]
    fn test_decode_invalid_character() {
        let err = decode("u0wt6pa2").unwrap_err();
        assert_eq!(err, GeoTagError::InvalidTag("u0wt6pa2".to_string()));
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode("").is_err());
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(encode(95.0, 200.0), encode(90.0, 180.0));
    }

    #[test]
    fn test_error_display() {
        let err = GeoTagError::InvalidTag("!".to_string());
        assert_eq!(format!("{}", err), "Invalid geohash: \"!\"");
    }
}
