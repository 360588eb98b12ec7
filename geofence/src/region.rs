use serde::{Deserialize, Serialize};

use crate::{GeofenceError, GeofenceResult};

/// A point on the earth's surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn is_valid(self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A circular region to monitor.
///
/// Regions are compared by value; the platform identifies them by
/// `identifier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceRegion {
    identifier: String,
    center: Coordinate,
    radius: f64,
}

impl GeofenceRegion {
    /// Creates a region of `radius` meters around `center`.
    ///
    /// # Errors
    ///
    /// Returns [`GeofenceError::InvalidRegion`] if the identifier is empty,
    /// the center lies outside valid coordinates, or the radius is not a
    /// positive finite number.
    pub fn new(
        identifier: impl Into<String>,
        center: Coordinate,
        radius: f64,
    ) -> GeofenceResult<Self> {
        let region = Self {
            identifier: identifier.into(),
            center,
            radius,
        };
        region.validate()?;
        Ok(region)
    }

    /// Identifier the platform uses for this region.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Center of the region.
    #[must_use]
    pub const fn center(&self) -> Coordinate {
        self.center
    }

    /// Radius in meters.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Parses a region from JSON and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`GeofenceError::Serialization`] for malformed JSON and
    /// [`GeofenceError::InvalidRegion`] for a region [`new`](Self::new)
    /// would reject.
    pub fn from_json(json: &str) -> GeofenceResult<Self> {
        let region: Self = serde_json::from_str(json)?;
        region.validate()?;
        Ok(region)
    }

    pub(crate) fn validate(&self) -> GeofenceResult<()> {
        let reason = if self.identifier.is_empty() {
            "identifier is empty"
        } else if !self.center.is_valid() {
            "center is outside valid coordinates"
        } else if !(self.radius.is_finite() && self.radius > 0.0) {
            "radius must be a positive number of meters"
        } else {
            return Ok(());
        };

        Err(GeofenceError::InvalidRegion {
            reason: reason.to_owned(),
        })
    }
}
