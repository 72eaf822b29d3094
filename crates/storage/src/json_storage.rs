//! JSON file storage implementation.
//!
//! Stores one pretty-printed JSON document per shipment under
//! `<root>/shipments/<record-key>.json`. Writes go to a temporary file first
//! and are renamed into place, so a crash never leaves a half-written record.
//!
//! Every write holds `<root>/shipments.lock`, created exclusively, for the
//! whole read-check-rename. Separate processes sharing a root therefore see
//! each other's versions and a stale writer gets a conflict.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use async_trait::async_trait;
use shiptrack_core::{RecordKey, Shipment, ShipmentFilter, ShipmentId};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use super::trait_::check_write;
use super::{Result, Storage, StorageError};

const LOCK_FILE: &str = "shipments.lock";
const LOCK_RETRY: Duration = Duration::from_millis(20);
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
/// A lock older than this was left behind by a writer that died.
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    lock_timeout: Duration,
    closed: bool,
}

impl JsonStorage {
    /// Open storage rooted at `root`, creating the directory layout if needed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("shipments")).await?;
        info!("Opened shipment store at {}", root.display());

        Ok(Self {
            root,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            closed: false,
        })
    }

    /// How long a write waits for another writer's lock before failing.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    fn shipments_dir(&self) -> PathBuf {
        self.root.join("shipments")
    }

    fn shipment_path(&self, key: &RecordKey) -> PathBuf {
        self.shipments_dir().join(format!("{}.json", key))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }

    async fn lock(&self) -> Result<WriteLock> {
        WriteLock::acquire(self.root.join(LOCK_FILE), self.lock_timeout).await
    }

    async fn find_by_id(&self, id: &ShipmentId) -> Result<Option<Shipment>> {
        let all: Vec<Shipment> = list_dir(&self.shipments_dir()).await?;
        Ok(all.into_iter().find(|s| &s.shipment_id == id))
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn save_shipment(&mut self, shipment: &Shipment) -> Result<u64> {
        self.ensure_open()?;
        let _lock = self.lock().await?;
        let path = self.shipment_path(&shipment.key);

        let stored: Option<Shipment> = read_json(&path).await?;
        let id_owner = self.find_by_id(&shipment.shipment_id).await?.map(|s| s.key);
        let version = check_write(shipment, stored.as_ref(), id_owner.as_ref())
            .inspect_err(|e| warn!("Rejected write for {}: {}", shipment.shipment_id, e))?;

        let mut record = shipment.clone();
        record.version = version;
        write_json(&path, &record).await?;

        debug!("Saved shipment {} (v{})", record.shipment_id, version);
        Ok(version)
    }

    async fn load_shipment(&self, id: &ShipmentId) -> Result<Option<Shipment>> {
        self.ensure_open()?;
        self.find_by_id(id).await
    }

    async fn load_by_key(&self, key: &RecordKey) -> Result<Option<Shipment>> {
        self.ensure_open()?;
        read_json(&self.shipment_path(key)).await
    }

    async fn list_shipments(&self, filter: &ShipmentFilter) -> Result<Vec<Shipment>> {
        self.ensure_open()?;
        let all: Vec<Shipment> = list_dir(&self.shipments_dir()).await?;
        Ok(filter.apply(all))
    }

    async fn delete_shipment(&mut self, key: &RecordKey) -> Result<bool> {
        self.ensure_open()?;
        let _lock = self.lock().await?;
        match fs::remove_file(self.shipment_path(key)).await {
            Ok(()) => {
                debug!("Deleted shipment record {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn health_check(&self) -> bool {
        !self.closed
            && fs::metadata(self.shipments_dir())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false)
    }

    async fn close(&mut self) -> Result<()> {
        // Every write is already renamed into place; nothing to flush.
        self.closed = true;
        info!("Closed shipment store at {}", self.root.display());
        Ok(())
    }
}

/// Exclusive store lock, released on drop.
struct WriteLock {
    path: PathBuf,
}

impl WriteLock {
    async fn acquire(path: PathBuf, timeout: Duration) -> Result<Self> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    let lock = Self { path };
                    file.write_all(std::process::id().to_string().as_bytes()).await?;
                    return Ok(lock);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if lock_age(&path).await.is_some_and(|age| age > STALE_LOCK_AGE) {
                        warn!("Removing stale lock {}", path.display());
                        match fs::remove_file(&path).await {
                            Ok(()) => continue,
                            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                            Err(e) => return Err(e.into()),
                        }
                    }
                    if tokio::time::Instant::now() >= deadline {
                        return Err(StorageError::Locked(path));
                    }
                    tokio::time::sleep(LOCK_RETRY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

async fn lock_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).await.ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&path).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!("Skipping unreadable record {}: {}", path.display(), e),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use shiptrack_core::{Coordinate, CurrentLocation, Location, ShipmentStatus, SortField, SortOrder};

    fn create_test_shipment(id: &str, status: ShipmentStatus, hour: i64) -> Shipment {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hour);
        let here = Coordinate::new(51.5074, -0.1278).unwrap();
        Shipment {
            key: RecordKey::new(),
            shipment_id: ShipmentId::from(id),
            container_id: "TGHU8812345".to_string(),
            cargo: "Textiles".to_string(),
            weight: 450.0,
            current_location: CurrentLocation {
                name: "London".to_string(),
                coordinates: here,
                timestamp: at,
            },
            destination: Location {
                name: "Paris".to_string(),
                coordinates: Coordinate::new(48.8566, 2.3522).unwrap(),
            },
            route: Vec::new(),
            status,
            estimated_arrival: at,
            created_at: at,
            updated_at: at,
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::open(dir.path()).await.unwrap();

        let mut shipment = create_test_shipment("SH100", ShipmentStatus::Pending, 0);
        shipment.version = storage.save_shipment(&shipment).await.unwrap();
        assert_eq!(shipment.version, 1);

        let by_id = storage.load_shipment(&shipment.shipment_id).await.unwrap().unwrap();
        assert_eq!(by_id, shipment);
        let by_key = storage.load_by_key(&shipment.key).await.unwrap().unwrap();
        assert_eq!(by_key, shipment);

        assert!(storage.load_shipment(&ShipmentId::from("SH404")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::open(dir.path()).await.unwrap();

        let mut shipment = create_test_shipment("SH101", ShipmentStatus::Pending, 0);
        shipment.version = storage.save_shipment(&shipment).await.unwrap();

        let stale = shipment.clone();
        shipment.status = ShipmentStatus::InTransit;
        shipment.version = storage.save_shipment(&shipment).await.unwrap();
        assert_eq!(shipment.version, 2);

        let err = storage.save_shipment(&stale).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict { expected: 1, found: 2, .. }));
    }

    #[tokio::test]
    async fn test_duplicate_shipment_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::open(dir.path()).await.unwrap();

        let first = create_test_shipment("SH102", ShipmentStatus::Pending, 0);
        storage.save_shipment(&first).await.unwrap();

        let second = create_test_shipment("SH102", ShipmentStatus::Pending, 1);
        let err = storage.save_shipment(&second).await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateId(_)));
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::open(dir.path()).await.unwrap();

        for (id, status, hour) in [
            ("SH1", ShipmentStatus::InTransit, 1),
            ("SH2", ShipmentStatus::Delivered, 2),
            ("SH3", ShipmentStatus::InTransit, 3),
        ] {
            storage.save_shipment(&create_test_shipment(id, status, hour)).await.unwrap();
        }

        let all = storage.list_shipments(&ShipmentFilter::default()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|s| s.shipment_id.as_str()).collect();
        assert_eq!(ids, ["SH3", "SH2", "SH1"]);

        let filter = ShipmentFilter {
            status: Some(ShipmentStatus::InTransit),
            sort_by: SortField::CreatedAt,
            order: SortOrder::Asc,
        };
        let in_transit = storage.list_shipments(&filter).await.unwrap();
        let ids: Vec<_> = in_transit.iter().map(|s| s.shipment_id.as_str()).collect();
        assert_eq!(ids, ["SH1", "SH3"]);
    }

    #[tokio::test]
    async fn test_delete_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let shipment = create_test_shipment("SH103", ShipmentStatus::Pending, 0);
        {
            let mut storage = JsonStorage::open(dir.path()).await.unwrap();
            storage.save_shipment(&shipment).await.unwrap();
            storage.close().await.unwrap();
        }

        let mut storage = JsonStorage::open(dir.path()).await.unwrap();
        assert!(storage.load_by_key(&shipment.key).await.unwrap().is_some());
        assert!(storage.delete_shipment(&shipment.key).await.unwrap());
        assert!(!storage.delete_shipment(&shipment.key).await.unwrap());
        assert!(storage.load_by_key(&shipment.key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writers_in_separate_handles_cannot_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let mut seed = JsonStorage::open(dir.path()).await.unwrap();
        let mut shipment = create_test_shipment("SH104", ShipmentStatus::Pending, 0);
        shipment.version = seed.save_shipment(&shipment).await.unwrap();

        // Two independent handles, as two CLI runs would have, both read v1
        let mut a = JsonStorage::open(dir.path()).await.unwrap();
        let mut b = JsonStorage::open(dir.path()).await.unwrap();
        let mut from_a = a.load_by_key(&shipment.key).await.unwrap().unwrap();
        let mut from_b = b.load_by_key(&shipment.key).await.unwrap().unwrap();
        from_a.cargo = "Written by A".to_string();
        from_b.cargo = "Written by B".to_string();

        let (ra, rb) = tokio::join!(a.save_shipment(&from_a), b.save_shipment(&from_b));
        let (winner, loser) = match (ra, rb) {
            (Ok(v), Err(e)) => ((v, from_a.cargo), e),
            (Err(e), Ok(v)) => ((v, from_b.cargo), e),
            other => panic!("expected exactly one write to land, got {other:?}"),
        };
        assert_eq!(winner.0, 2);
        assert!(matches!(loser, StorageError::Conflict { expected: 1, found: 2, .. }));

        let stored = seed.load_by_key(&shipment.key).await.unwrap().unwrap();
        assert_eq!(stored.cargo, winner.1);
        assert!(!dir.path().join(LOCK_FILE).exists());
    }

    #[tokio::test]
    async fn test_held_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::open(dir.path())
            .await
            .unwrap()
            .with_lock_timeout(std::time::Duration::from_millis(100));
        let shipment = create_test_shipment("SH105", ShipmentStatus::Pending, 0);

        std::fs::write(dir.path().join(LOCK_FILE), "other writer").unwrap();
        let err = storage.save_shipment(&shipment).await.unwrap_err();
        assert!(matches!(err, StorageError::Locked(_)));
        assert!(storage.load_by_key(&shipment.key).await.unwrap().is_none());

        std::fs::remove_file(dir.path().join(LOCK_FILE)).unwrap();
        assert_eq!(storage.save_shipment(&shipment).await.unwrap(), 1);
        assert!(!dir.path().join(LOCK_FILE).exists());
    }

    #[tokio::test]
    async fn test_closed_storage_rejects_calls() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::open(dir.path()).await.unwrap();
        assert!(storage.health_check().await);

        storage.close().await.unwrap();
        assert!(!storage.health_check().await);
        let err = storage.list_shipments(&ShipmentFilter::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::Closed));
    }
}
