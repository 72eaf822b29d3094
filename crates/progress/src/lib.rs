//! Journey progress tracking.
//!
//! The progress engine turns a reported position into a new shipment state,
//! and the ETA reporter derives read-only telemetry from a shipment.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod eta;

pub use config::{ConfigError, TrackingConfig};
pub use engine::{LocationUpdate, ProgressEngine};
pub use error::ProgressError;
pub use eta::{EtaReporter, EtaSummary};
