//! Shipment management service.

use std::collections::BTreeMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use shiptrack_core::{
    LocationInput, NewShipment, RecordKey, Shipment, ShipmentFilter, ShipmentId, ShipmentPatch,
    ShipmentStatus,
};
use shiptrack_progress::{EtaReporter, EtaSummary, LocationUpdate, ProgressEngine, TrackingConfig};
use shiptrack_storage::{Storage, StorageError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::error::ManagerError;

/// Fresh shipment IDs tried when a generated one is already taken.
const ID_REGENERATIONS: usize = 2;

/// Shipment management service.
///
/// Every `id` argument goes through the same resolution: the public
/// shipment ID first, then the record key if the text looks like one.
#[async_trait]
pub trait ShipmentManager: Send + Sync {
    /// Open a new shipment.
    async fn create(&self, draft: NewShipment) -> Result<Shipment, ManagerError>;

    /// Fetch one shipment.
    async fn get(&self, id: &str) -> Result<Shipment, ManagerError>;

    /// List shipments.
    async fn list(&self, filter: &ShipmentFilter) -> Result<Vec<Shipment>, ManagerError>;

    /// Apply a reported position.
    async fn report_location(
        &self,
        id: &str,
        report: LocationInput,
    ) -> Result<LocationUpdate, ManagerError>;

    /// Journey telemetry as of now.
    async fn summarize(&self, id: &str) -> Result<EtaSummary, ManagerError>;

    /// Force a status, bypassing distance checks.
    async fn set_status(&self, id: &str, status: &str) -> Result<Shipment, ManagerError>;

    /// Edit container, cargo, weight or destination.
    async fn update_details(
        &self,
        id: &str,
        patch: ShipmentPatch,
    ) -> Result<Shipment, ManagerError>;

    /// Remove a shipment, returning its record key.
    async fn delete(&self, id: &str) -> Result<RecordKey, ManagerError>;
}

/// Configuration for the shipment manager.
#[derive(Debug, Clone, Default)]
pub struct ManagerConfig {
    /// Engine and reporter tunables
    pub tracking: TrackingConfig,
}

/// Basic shipment manager implementation.
pub struct BasicShipmentManager<S: Storage> {
    storage: Arc<Mutex<S>>,
    engine: ProgressEngine,
    reporter: EtaReporter,
}

impl<S: Storage> BasicShipmentManager<S> {
    /// Create a manager with default tracking settings.
    pub fn new(storage: S) -> Self {
        Self::build(storage, TrackingConfig::default())
    }

    /// Create a manager with explicit settings, rejecting unusable ones.
    pub fn with_config(storage: S, config: ManagerConfig) -> Result<Self, ManagerError> {
        config.tracking.validate()?;
        Ok(Self::build(storage, config.tracking))
    }

    fn build(storage: S, tracking: TrackingConfig) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            engine: ProgressEngine::new(tracking),
            reporter: EtaReporter::new(tracking),
        }
    }

    /// Whether the storage backend is usable.
    pub async fn health_check(&self) -> bool {
        self.storage.lock().await.health_check().await
    }

    /// Number of shipments in each status. Statuses with none are included.
    pub async fn status_counts(&self) -> Result<BTreeMap<ShipmentStatus, usize>, ManagerError> {
        let all = self.storage.lock().await.list_shipments(&ShipmentFilter::default()).await?;
        let mut counts: BTreeMap<_, _> = ShipmentStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        for shipment in &all {
            *counts.entry(shipment.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Release the storage backend.
    pub async fn close(&self) -> Result<(), ManagerError> {
        self.storage.lock().await.close().await?;
        Ok(())
    }
}

/// Find a shipment by public ID, falling back to its record key.
async fn resolve<S: Storage + ?Sized>(storage: &S, id: &str) -> Result<Shipment, ManagerError> {
    if let Some(shipment) = storage.load_shipment(&ShipmentId::from(id)).await? {
        return Ok(shipment);
    }
    if let Ok(key) = id.parse::<RecordKey>() {
        if let Some(shipment) = storage.load_by_key(&key).await? {
            return Ok(shipment);
        }
    }
    debug!("Shipment not found for ID: {}", id);
    Err(ManagerError::NotFound(id.to_string()))
}

#[async_trait]
impl<S: Storage + 'static> ShipmentManager for BasicShipmentManager<S> {
    async fn create(&self, draft: NewShipment) -> Result<Shipment, ManagerError> {
        let mut shipment =
            self.engine
                .start(RecordKey::new(), ShipmentId::generate(), draft, Utc::now())?;

        let mut storage = self.storage.lock().await;
        let mut regenerated = 0;
        shipment.version = loop {
            match storage.save_shipment(&shipment).await {
                Err(StorageError::DuplicateId(taken)) if regenerated < ID_REGENERATIONS => {
                    regenerated += 1;
                    warn!("Shipment ID {} already taken, generating another", taken);
                    shipment.shipment_id = ShipmentId::generate();
                }
                result => break result?,
            }
        };
        info!(
            "Created shipment {} ({} -> {}), ETA {}",
            shipment.shipment_id,
            shipment.current_location.name,
            shipment.destination.name,
            shipment.estimated_arrival
        );
        Ok(shipment)
    }

    async fn get(&self, id: &str) -> Result<Shipment, ManagerError> {
        let storage = self.storage.lock().await;
        resolve(&*storage, id).await
    }

    async fn list(&self, filter: &ShipmentFilter) -> Result<Vec<Shipment>, ManagerError> {
        Ok(self.storage.lock().await.list_shipments(filter).await?)
    }

    async fn report_location(
        &self,
        id: &str,
        report: LocationInput,
    ) -> Result<LocationUpdate, ManagerError> {
        let mut storage = self.storage.lock().await;
        let shipment = resolve(&*storage, id).await?;

        let mut update = self.engine.report_location(shipment, report, Utc::now())?;
        update.shipment.version = storage.save_shipment(&update.shipment).await?;

        info!(
            "Shipment {} reported at {} ({:.1} km to go, {})",
            update.shipment.shipment_id,
            update.shipment.current_location.name,
            update.distance_to_destination,
            update.shipment.status
        );
        Ok(update)
    }

    async fn summarize(&self, id: &str) -> Result<EtaSummary, ManagerError> {
        let shipment = {
            let storage = self.storage.lock().await;
            resolve(&*storage, id).await?
        };
        Ok(self.reporter.summarize(&shipment, Utc::now()))
    }

    async fn set_status(&self, id: &str, status: &str) -> Result<Shipment, ManagerError> {
        let status: ShipmentStatus = status.parse()?;

        let mut storage = self.storage.lock().await;
        let shipment = resolve(&*storage, id).await?;
        let previous = shipment.status;

        let mut shipment = self.engine.override_status(shipment, status, Utc::now());
        shipment.version = storage.save_shipment(&shipment).await?;

        info!("Shipment {} status forced {} -> {}", shipment.shipment_id, previous, status);
        Ok(shipment)
    }

    async fn update_details(
        &self,
        id: &str,
        patch: ShipmentPatch,
    ) -> Result<Shipment, ManagerError> {
        let mut storage = self.storage.lock().await;
        let mut shipment = resolve(&*storage, id).await?;

        patch.apply(&mut shipment, Utc::now())?;
        shipment.version = storage.save_shipment(&shipment).await?;

        info!("Updated details of shipment {}", shipment.shipment_id);
        Ok(shipment)
    }

    async fn delete(&self, id: &str) -> Result<RecordKey, ManagerError> {
        let mut storage = self.storage.lock().await;
        let shipment = resolve(&*storage, id).await?;

        if !storage.delete_shipment(&shipment.key).await? {
            return Err(ManagerError::NotFound(id.to_string()));
        }
        info!("Deleted shipment {} ({})", shipment.shipment_id, shipment.key);
        Ok(shipment.key)
    }
}
