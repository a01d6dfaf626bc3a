//! Location model for geographic coordinates and catalog members

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Geographic point in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(try_from = "RawPoint")]
pub struct GeoPoint {
    /// Latitude in decimal degrees, within [-90, 90]
    latitude: f64,
    /// Longitude in decimal degrees, within [-180, 180]
    longitude: f64,
}

#[derive(Deserialize)]
struct RawPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Create a validated point
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, EngineError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(EngineError::validation(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(EngineError::validation(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Format point as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = EngineError;

    fn try_from(value: RawPoint) -> Result<Self, Self::Error> {
        Self::new(value.latitude, value.longitude)
    }
}

/// A named catalog member, such as a fixed site
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LocationEntry {
    pub id: String,
    pub name: String,
    pub point: GeoPoint,
}

impl LocationEntry {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            point,
        }
    }
}
