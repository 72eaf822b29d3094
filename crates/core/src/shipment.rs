//! Shipment model - a container's journey from origin to destination.

use serde::{Deserialize, Serialize};
use crate::geo::{Coordinate, CoordinateError, CoordinateInput};
use crate::id::{RecordKey, ShipmentId};
use crate::Time;

/// A shipment and everything recorded about its journey so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    /// Storage-native record key
    pub key: RecordKey,

    /// Public identifier
    pub shipment_id: ShipmentId,

    /// Container carrying the cargo
    pub container_id: String,

    /// Cargo description
    pub cargo: String,

    /// Cargo weight
    pub weight: f64,

    /// Where the shipment is now
    pub current_location: CurrentLocation,

    /// Where the shipment is going
    pub destination: Location,

    /// Every reported position, oldest first
    pub route: Vec<Waypoint>,

    /// Current status
    pub status: ShipmentStatus,

    /// Projected arrival, or the actual arrival once delivered
    pub estimated_arrival: Time,

    /// When created
    pub created_at: Time,

    /// Last mutation
    pub updated_at: Time,

    /// Optimistic concurrency counter, owned by storage
    #[serde(default)]
    pub version: u64,
}

impl Shipment {
    /// Sum of the per-leg distances along the route.
    pub fn total_distance_covered(&self) -> f64 {
        self.route.iter().map(|w| w.distance_covered_km).sum()
    }
}

/// A named place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Place name
    pub name: String,

    /// Position
    pub coordinates: Coordinate,
}

/// One recorded position along a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Place name
    pub name: String,

    /// Position
    pub coordinates: Coordinate,

    /// When it was reported
    pub timestamp: Time,

    /// Distance from the previous waypoint (0 for the first)
    pub distance_covered_km: f64,
}

/// The most recently reported position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentLocation {
    /// Place name
    pub name: String,

    /// Position
    pub coordinates: Coordinate,

    /// When it was reported
    pub timestamp: Time,
}

impl From<&Waypoint> for CurrentLocation {
    fn from(w: &Waypoint) -> Self {
        Self {
            name: w.name.clone(),
            coordinates: w.coordinates,
            timestamp: w.timestamp,
        }
    }
}

/// Shipment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShipmentStatus {
    /// Created, no movement reported yet
    Pending,
    /// Moving towards the destination
    InTransit,
    /// Behind schedule
    Delayed,
    /// Arrived
    Delivered,
}

impl ShipmentStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ShipmentStatus; 4] = [
        ShipmentStatus::Pending,
        ShipmentStatus::InTransit,
        ShipmentStatus::Delayed,
        ShipmentStatus::Delivered,
    ];

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::InTransit => "in-transit",
            ShipmentStatus::Delayed => "delayed",
            ShipmentStatus::Delivered => "delivered",
        }
    }

    /// No further location reports are accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered)
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status '{0}'. Must be one of: pending, in-transit, delivered, delayed")]
pub struct ParseStatusError(pub String);

impl std::str::FromStr for ShipmentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShipmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// Request validation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A required text field is empty
    #[error("{0} is required")]
    Required(&'static str),

    /// Weight must be a positive number
    #[error("weight must be a positive number, got {0}")]
    InvalidWeight(f64),

    /// Coordinates are missing or malformed
    #[error("{field}: {source}")]
    Coordinates {
        /// Which location
        field: &'static str,
        /// What was wrong
        source: CoordinateError,
    },
}

/// A named place as it arrives from a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInput {
    /// Place name
    pub name: String,

    /// Position, if supplied
    pub coordinates: Option<CoordinateInput>,
}

impl LocationInput {
    /// Named place with both coordinates present.
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            coordinates: Some(CoordinateInput::new(latitude, longitude)),
        }
    }

    /// Validate into a [`Location`]. `field` names the input in errors.
    pub fn validate(self, field: &'static str) -> Result<Location, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Required(field));
        }
        let coordinates = self
            .coordinates
            .ok_or(CoordinateError::Missing("coordinates"))
            .and_then(Coordinate::try_from)
            .map_err(|source| ValidationError::Coordinates { field, source })?;
        Ok(Location {
            name: self.name,
            coordinates,
        })
    }
}

/// Everything needed to open a new shipment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewShipment {
    /// Container carrying the cargo
    pub container_id: String,

    /// Where the journey starts
    pub current_location: LocationInput,

    /// Where the journey ends
    pub destination: LocationInput,

    /// Cargo description
    pub cargo: String,

    /// Cargo weight
    pub weight: f64,
}

/// A validated [`NewShipment`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidShipment {
    /// Container carrying the cargo
    pub container_id: String,
    /// Where the journey starts
    pub origin: Location,
    /// Where the journey ends
    pub destination: Location,
    /// Cargo description
    pub cargo: String,
    /// Cargo weight
    pub weight: f64,
}

impl NewShipment {
    /// Check required fields and coordinates.
    pub fn validate(self) -> Result<ValidShipment, ValidationError> {
        let container_id = required("container_id", self.container_id)?;
        let cargo = required("cargo", self.cargo)?;
        let weight = positive_weight(self.weight)?;
        let origin = self.current_location.validate("current_location")?;
        let destination = self.destination.validate("destination")?;
        Ok(ValidShipment {
            container_id,
            origin,
            destination,
            cargo,
            weight,
        })
    }
}

/// Editable shipment details. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentPatch {
    /// New container
    pub container_id: Option<String>,

    /// New cargo description
    pub cargo: Option<String>,

    /// New weight
    pub weight: Option<f64>,

    /// New destination
    pub destination: Option<LocationInput>,
}

impl ShipmentPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.container_id.is_none()
            && self.cargo.is_none()
            && self.weight.is_none()
            && self.destination.is_none()
    }

    /// Validate every supplied field, then apply them all.
    ///
    /// Status and ETA are left alone, even when the destination moves.
    pub fn apply(self, shipment: &mut Shipment, now: Time) -> Result<(), ValidationError> {
        let container_id = self.container_id.map(|v| required("container_id", v)).transpose()?;
        let cargo = self.cargo.map(|v| required("cargo", v)).transpose()?;
        let weight = self.weight.map(positive_weight).transpose()?;
        let destination = self.destination.map(|d| d.validate("destination")).transpose()?;

        if let Some(v) = container_id {
            shipment.container_id = v;
        }
        if let Some(v) = cargo {
            shipment.cargo = v;
        }
        if let Some(v) = weight {
            shipment.weight = v;
        }
        if let Some(v) = destination {
            shipment.destination = v;
        }
        shipment.updated_at = now;
        Ok(())
    }
}

fn required(field: &'static str, value: String) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(value)
    }
}

fn positive_weight(weight: f64) -> Result<f64, ValidationError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(weight)
    } else {
        Err(ValidationError::InvalidWeight(weight))
    }
}
