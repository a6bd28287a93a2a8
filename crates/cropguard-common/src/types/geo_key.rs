//! GeoKey - Canonical location key
//!
//! Coordinates are stored as degrees × 10⁴ in signed integers. The scaled
//! pair itself is the key: two locations are equal only if both scaled
//! coordinates match exactly.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Fixed-point scale applied to degrees
pub const COORD_SCALE: f64 = 10_000.0;

/// Maximum scaled latitude (90°)
pub const MAX_LAT: i32 = 900_000;

/// Maximum scaled longitude (180°)
pub const MAX_LON: i32 = 1_800_000;

/// Canonical, hashable location key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeoKey {
    lat: i32,
    lon: i32,
}

impl GeoKey {
    /// Build a key from degrees, scaling by 10⁴ and range-checking
    pub fn from_degrees(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(ValidationError::InvalidLocation { lat, lon });
        }

        let scaled_lat = (lat * COORD_SCALE).round();
        let scaled_lon = (lon * COORD_SCALE).round();

        if scaled_lat.abs() > MAX_LAT as f64 || scaled_lon.abs() > MAX_LON as f64 {
            return Err(ValidationError::InvalidLocation { lat, lon });
        }

        Ok(Self {
            lat: scaled_lat as i32,
            lon: scaled_lon as i32,
        })
    }

    /// Build a key from already-scaled integers
    pub fn from_scaled(lat: i32, lon: i32) -> Result<Self, ValidationError> {
        if !(-MAX_LAT..=MAX_LAT).contains(&lat) || !(-MAX_LON..=MAX_LON).contains(&lon) {
            return Err(ValidationError::InvalidLocation {
                lat: lat as f64 / COORD_SCALE,
                lon: lon as f64 / COORD_SCALE,
            });
        }
        Ok(Self { lat, lon })
    }

    /// Scaled latitude
    #[inline]
    pub fn lat(&self) -> i32 {
        self.lat
    }

    /// Scaled longitude
    #[inline]
    pub fn lon(&self) -> i32 {
        self.lon
    }

    /// Latitude in degrees
    pub fn lat_degrees(&self) -> f64 {
        self.lat as f64 / COORD_SCALE
    }

    /// Longitude in degrees
    pub fn lon_degrees(&self) -> f64 {
        self.lon as f64 / COORD_SCALE
    }
}

impl std::fmt::Display for GeoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4},{:.4}", self.lat_degrees(), self.lon_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        let key = GeoKey::from_degrees(-1.0, 36.0).unwrap();
        assert_eq!(key.lat(), -10_000);
        assert_eq!(key.lon(), 360_000);
        assert_eq!(key.to_string(), "-1.0000,36.0000");
    }

    #[test]
    fn test_bounds_inclusive() {
        assert!(GeoKey::from_degrees(90.0, 180.0).is_ok());
        assert!(GeoKey::from_degrees(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_out_of_bounds() {
        assert!(matches!(
            GeoKey::from_degrees(90.0001, 0.0),
            Err(ValidationError::InvalidLocation { .. })
        ));
        assert!(GeoKey::from_degrees(0.0, -180.0001).is_err());
        assert!(GeoKey::from_degrees(f64::NAN, 0.0).is_err());
        assert!(GeoKey::from_scaled(900_001, 0).is_err());
        assert!(GeoKey::from_scaled(0, 1_800_000).is_ok());
    }

    #[test]
    fn test_no_fuzzy_equality() {
        let a = GeoKey::from_degrees(12.3456, 45.6789).unwrap();
        let b = GeoKey::from_degrees(12.3457, 45.6789).unwrap();
        let c = GeoKey::from_scaled(123_456, 456_789).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, c);
    }
}
