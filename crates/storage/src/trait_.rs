//! Storage trait abstraction.

use async_trait::async_trait;
use shiptrack_core::{RecordKey, Shipment, ShipmentFilter, ShipmentId};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The stored record changed since it was read
    #[error("Version conflict on {key}: expected {expected}, found {found}")]
    Conflict {
        /// Record that was being written
        key: RecordKey,
        /// Version the writer read
        expected: u64,
        /// Version currently stored
        found: u64,
    },

    /// Another record already uses this shipment ID
    #[error("Shipment ID already in use: {0}")]
    DuplicateId(ShipmentId),

    /// The handle was closed
    #[error("Storage is closed")]
    Closed,

    /// Another writer held the store lock for too long
    #[error("Storage is locked by another writer: {}", .0.display())]
    Locked(std::path::PathBuf),
}

/// Storage abstraction for shipment data.
///
/// Writes use optimistic concurrency: `shipment.version` must equal the
/// stored version (0 for a new record). A successful save returns the new
/// version, which the caller copies back onto its value.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Save a shipment (create or update).
    async fn save_shipment(&mut self, shipment: &Shipment) -> Result<u64>;

    /// Load a shipment by its public ID.
    async fn load_shipment(&self, id: &ShipmentId) -> Result<Option<Shipment>>;

    /// Load a shipment by its record key.
    async fn load_by_key(&self, key: &RecordKey) -> Result<Option<Shipment>>;

    /// List shipments matching the filter, in the filter's order.
    async fn list_shipments(&self, filter: &ShipmentFilter) -> Result<Vec<Shipment>>;

    /// Delete a shipment. Returns whether a record was removed.
    async fn delete_shipment(&mut self, key: &RecordKey) -> Result<bool>;

    /// Whether the backend is reachable and open.
    async fn health_check(&self) -> bool;

    /// Flush and release the backend. Later calls fail with [`StorageError::Closed`].
    async fn close(&mut self) -> Result<()>;
}

/// Check a pending write against what is stored under the same key and ID.
///
/// Shared by the backends so they agree on conflict rules.
pub(crate) fn check_write(
    shipment: &Shipment,
    stored: Option<&Shipment>,
    id_owner: Option<&RecordKey>,
) -> Result<u64> {
    let found = stored.map_or(0, |s| s.version);
    if found != shipment.version {
        return Err(StorageError::Conflict {
            key: shipment.key.clone(),
            expected: shipment.version,
            found,
        });
    }
    if let Some(owner) = id_owner {
        if owner != &shipment.key {
            return Err(StorageError::DuplicateId(shipment.shipment_id.clone()));
        }
    }
    Ok(found + 1)
}
