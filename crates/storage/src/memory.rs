//! In-memory storage backend.

use std::collections::HashMap;
use async_trait::async_trait;
use shiptrack_core::{RecordKey, Shipment, ShipmentFilter, ShipmentId};
use tracing::debug;
use super::trait_::check_write;
use super::{Result, Storage, StorageError};

/// Keeps shipments in a map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    shipments: HashMap<RecordKey, Shipment>,
    closed: bool,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_shipment(&mut self, shipment: &Shipment) -> Result<u64> {
        self.ensure_open()?;
        let id_owner = self
            .shipments
            .values()
            .find(|s| s.shipment_id == shipment.shipment_id)
            .map(|s| &s.key);
        let version = check_write(shipment, self.shipments.get(&shipment.key), id_owner)?;

        let mut record = shipment.clone();
        record.version = version;
        self.shipments.insert(record.key.clone(), record);
        debug!("Saved shipment {} (v{})", shipment.shipment_id, version);
        Ok(version)
    }

    async fn load_shipment(&self, id: &ShipmentId) -> Result<Option<Shipment>> {
        self.ensure_open()?;
        Ok(self.shipments.values().find(|s| &s.shipment_id == id).cloned())
    }

    async fn load_by_key(&self, key: &RecordKey) -> Result<Option<Shipment>> {
        self.ensure_open()?;
        Ok(self.shipments.get(key).cloned())
    }

    async fn list_shipments(&self, filter: &ShipmentFilter) -> Result<Vec<Shipment>> {
        self.ensure_open()?;
        Ok(filter.apply(self.shipments.values().cloned()))
    }

    async fn delete_shipment(&mut self, key: &RecordKey) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.shipments.remove(key).is_some())
    }

    async fn health_check(&self) -> bool {
        !self.closed
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.shipments.clear();
        Ok(())
    }
}
