//! Geographic primitives and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for all distance calculations.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in `[-90, 90]`
    pub latitude: f64,

    /// Longitude in `[-180, 180]`
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        check_axis("latitude", latitude, 90.0)?;
        check_axis("longitude", longitude, 180.0)?;
        Ok(Self { latitude, longitude })
    }
}

fn check_axis(axis: &'static str, value: f64, bound: f64) -> Result<(), CoordinateError> {
    if !value.is_finite() {
        return Err(CoordinateError::NotFinite(axis));
    }
    if value < -bound || value > bound {
        return Err(CoordinateError::OutOfRange { axis, value });
    }
    Ok(())
}

/// Problems found while validating coordinates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    /// A component was not supplied
    #[error("{0} is required")]
    Missing(&'static str),

    /// A component is NaN or infinite
    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    /// A component lies outside its valid range
    #[error("{axis} {value} is out of range")]
    OutOfRange {
        /// Which component
        axis: &'static str,
        /// Offending value
        value: f64,
    },
}

/// Unvalidated coordinates as they arrive from a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateInput {
    /// Latitude, if supplied
    pub latitude: Option<f64>,

    /// Longitude, if supplied
    pub longitude: Option<f64>,
}

impl CoordinateInput {
    /// Both components present.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }
}

impl TryFrom<CoordinateInput> for Coordinate {
    type Error = CoordinateError;

    fn try_from(input: CoordinateInput) -> Result<Self, Self::Error> {
        let latitude = input.latitude.ok_or(CoordinateError::Missing("latitude"))?;
        let longitude = input.longitude.ok_or(CoordinateError::Missing("longitude"))?;
        Coordinate::new(latitude, longitude)
    }
}

impl From<Coordinate> for CoordinateInput {
    fn from(c: Coordinate) -> Self {
        Self::new(c.latitude, c.longitude)
    }
}

/// Great-circle distance between two coordinates in kilometres (haversine).
///
/// Out-of-range inputs still produce a number; callers validate first.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 near the antipode.
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}
