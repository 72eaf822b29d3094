//! Shipment management (host layer)
//!
//! Resolves identities, runs the progress engine inside a read-modify-write
//! against storage, and maps failures onto transport-friendly errors.

#![warn(missing_docs)]

pub mod error;
pub mod manager;

pub use error::ManagerError;
pub use manager::{BasicShipmentManager, ManagerConfig, ShipmentManager};
