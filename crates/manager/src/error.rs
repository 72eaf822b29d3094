//! Manager errors and their transport status codes.

use shiptrack_core::{ParseStatusError, ValidationError};
use shiptrack_progress::{ConfigError, ProgressError};
use shiptrack_storage::StorageError;

/// Errors returned by shipment management operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// No shipment matches the identifier in either form
    #[error("Shipment not found: {0}")]
    NotFound(String),

    /// Missing or malformed request data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Location report against a delivered shipment
    #[error("Cannot update location for delivered shipment {0}")]
    TerminalState(String),

    /// Tracking settings that cannot drive the engine
    #[error("Invalid tracking configuration: {0}")]
    InvalidConfig(String),

    /// Storage backend failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ManagerError {
    /// HTTP status a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ManagerError::NotFound(_) => 404,
            ManagerError::InvalidInput(_) | ManagerError::TerminalState(_) => 400,
            ManagerError::Storage(StorageError::Conflict { .. } | StorageError::DuplicateId(_)) => 409,
            ManagerError::InvalidConfig(_) | ManagerError::Storage(_) => 500,
        }
    }
}

impl From<ProgressError> for ManagerError {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::InvalidInput(v) => ManagerError::InvalidInput(v.to_string()),
            ProgressError::TerminalState { shipment_id } => {
                ManagerError::TerminalState(shipment_id.to_string())
            }
            e @ ProgressError::EtaOutOfRange { .. } => ManagerError::InvalidConfig(e.to_string()),
        }
    }
}

impl From<ConfigError> for ManagerError {
    fn from(e: ConfigError) -> Self {
        ManagerError::InvalidConfig(e.to_string())
    }
}

impl From<ValidationError> for ManagerError {
    fn from(e: ValidationError) -> Self {
        ManagerError::InvalidInput(e.to_string())
    }
}

impl From<ParseStatusError> for ManagerError {
    fn from(e: ParseStatusError) -> Self {
        ManagerError::InvalidInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiptrack_core::{RecordKey, ShipmentId};

    #[test]
    fn test_status_codes() {
        assert_eq!(ManagerError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ManagerError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(ManagerError::TerminalState("SH1".into()).status_code(), 400);
        let conflict = StorageError::Conflict { key: RecordKey::new(), expected: 1, found: 2 };
        assert_eq!(ManagerError::from(conflict).status_code(), 409);
        let duplicate = StorageError::DuplicateId(ShipmentId::from("SH1"));
        assert_eq!(ManagerError::from(duplicate).status_code(), 409);
        assert_eq!(ManagerError::from(StorageError::Closed).status_code(), 500);
    }

    #[test]
    fn test_progress_errors_map_across() {
        let terminal = ProgressError::TerminalState { shipment_id: ShipmentId::from("SH5") };
        assert!(matches!(ManagerError::from(terminal), ManagerError::TerminalState(id) if id == "SH5"));

        let invalid = ProgressError::InvalidInput(ValidationError::Required("cargo"));
        let err = ManagerError::from(invalid);
        assert_eq!(err.to_string(), "Invalid input: cargo is required");

        let unreachable = ProgressError::EtaOutOfRange { distance_km: 10.0, speed_kmh: 0.0 };
        let err = ManagerError::from(unreachable);
        assert!(matches!(err, ManagerError::InvalidConfig(_)));
        assert_eq!(err.status_code(), 500);
    }
}
