//! Progress engine errors.

use shiptrack_core::{ShipmentId, ValidationError};

/// Errors returned by the progress engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProgressError {
    /// The report or request was missing data or malformed
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// The shipment is delivered and accepts no more location reports
    #[error("cannot update location for delivered shipment {shipment_id}")]
    TerminalState {
        /// Shipment that was already delivered
        shipment_id: ShipmentId,
    },

    /// The projected arrival falls outside the representable time range
    #[error("cannot project an arrival {distance_km} km away at {speed_kmh} km/h")]
    EtaOutOfRange {
        /// Remaining distance (km)
        distance_km: f64,
        /// Speed the projection used (km/h)
        speed_kmh: f64,
    },
}
