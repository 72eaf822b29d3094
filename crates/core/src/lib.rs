//! Shiptrack core data models.
//!
//! This crate defines the geographic primitives, identities and the shipment
//! entity that the progress engine, storage backends and manager share.

#![warn(missing_docs)]

// Identities
mod id;

// Geography
pub mod geo;

// Shipments
mod shipment;
mod filter;

// Re-exports
pub use id::*;

pub use geo::{distance_km, Coordinate, CoordinateError, CoordinateInput, EARTH_RADIUS_KM};
pub use shipment::{
    CurrentLocation, Location, LocationInput, NewShipment, ParseStatusError, Shipment,
    ShipmentPatch, ShipmentStatus, ValidShipment, ValidationError, Waypoint,
};
pub use filter::{ParseSortError, ShipmentFilter, SortField, SortOrder};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
