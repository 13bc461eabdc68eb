use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::types::{ExhibitorUpdate, ExistingExhibitor, NewExhibitor};

/// Exhibitor directory collaborator. The pipeline receives it explicitly and
/// never reaches for a global client.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Every record for the event, in a stable fetch order.
    async fn fetch_all(&self, event_id: &str) -> Result<Vec<ExistingExhibitor>>;

    async fn update(&self, id: Uuid, changes: &ExhibitorUpdate) -> Result<()>;

    /// Insert a record and return its new identifier.
    async fn insert(&self, event_id: &str, exhibitor: &NewExhibitor) -> Result<Uuid>;

    /// Delete every record for the event and return how many were removed.
    async fn delete_all(&self, event_id: &str) -> Result<usize>;
}

fn apply_update(record: &mut ExistingExhibitor, changes: &ExhibitorUpdate) {
    record.booth = changes.booth.clone();
    record.features = changes.features;
    record.contact = changes.contact.clone();
    record.updated_at = Utc::now();
}

fn new_record(event_id: &str, exhibitor: &NewExhibitor) -> ExistingExhibitor {
    let now = Utc::now();
    ExistingExhibitor {
        id: Uuid::new_v4(),
        event_id: event_id.to_string(),
        organization_name: exhibitor.organization_name.clone(),
        booth: exhibitor.booth.clone(),
        features: exhibitor.features,
        contact: exhibitor.contact.clone(),
        organization_type: exhibitor.organization_type,
        created_at: now,
        updated_at: now,
    }
}

/// In-memory directory for development and tests. Fetch order is insertion order.
#[derive(Clone, Default)]
pub struct InMemoryDirectoryStore {
    records: Arc<Mutex<Vec<ExistingExhibitor>>>,
}

impl InMemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ExistingExhibitor>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    /// Snapshot of every record across all events
    pub fn snapshot(&self) -> Vec<ExistingExhibitor> {
        self.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<ExistingExhibitor>>> {
        self.records
            .lock()
            .map_err(|_| SyncError::store("directory lock poisoned"))
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn fetch_all(&self, event_id: &str) -> Result<Vec<ExistingExhibitor>> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, changes: &ExhibitorUpdate) -> Result<()> {
        let mut records = self.lock()?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SyncError::store(format!("exhibitor {} not found", id)))?;
        apply_update(record, changes);
        debug!("Updated exhibitor: {} with id {}", record.organization_name, id);
        Ok(())
    }

    async fn insert(&self, event_id: &str, exhibitor: &NewExhibitor) -> Result<Uuid> {
        let record = new_record(event_id, exhibitor);
        let id = record.id;
        self.lock()?.push(record);
        debug!("Created exhibitor: {} with id {}", exhibitor.organization_name, id);
        Ok(id)
    }

    async fn delete_all(&self, event_id: &str) -> Result<usize> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|r| r.event_id != event_id);
        Ok(before - records.len())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryFile {
    exhibitors: Vec<ExistingExhibitor>,
}

/// Directory persisted as a single JSON document, rewritten after every change.
/// Intended for a single local operator.
pub struct JsonFileDirectoryStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    guard: tokio::sync::Mutex<()>,
}

impl JsonFileDirectoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<DirectoryFile> {
        if !self.path.exists() {
            return Ok(DirectoryFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(DirectoryFile::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, file: &DirectoryFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Write to a sibling file and rename so a crash never leaves a truncated directory
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(file)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for JsonFileDirectoryStore {
    async fn fetch_all(&self, event_id: &str) -> Result<Vec<ExistingExhibitor>> {
        let _lock = self.guard.lock().await;
        let file = self.load()?;
        Ok(file
            .exhibitors
            .into_iter()
            .filter(|r| r.event_id == event_id)
            .collect())
    }

    async fn update(&self, id: Uuid, changes: &ExhibitorUpdate) -> Result<()> {
        let _lock = self.guard.lock().await;
        let mut file = self.load()?;
        let record = file
            .exhibitors
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SyncError::store(format!("exhibitor {} not found", id)))?;
        apply_update(record, changes);
        self.save(&file)
    }

    async fn insert(&self, event_id: &str, exhibitor: &NewExhibitor) -> Result<Uuid> {
        let _lock = self.guard.lock().await;
        let mut file = self.load()?;
        let record = new_record(event_id, exhibitor);
        let id = record.id;
        file.exhibitors.push(record);
        self.save(&file)?;
        Ok(id)
    }

    async fn delete_all(&self, event_id: &str) -> Result<usize> {
        let _lock = self.guard.lock().await;
        let mut file = self.load()?;
        let before = file.exhibitors.len();
        file.exhibitors.retain(|r| r.event_id != event_id);
        let removed = before - file.exhibitors.len();
        self.save(&file)?;
        Ok(removed)
    }
}
