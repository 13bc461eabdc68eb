#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

use exhibitor_sync::config::SourceConfig;
use exhibitor_sync::storage::{DirectoryStore, InMemoryDirectoryStore};
use exhibitor_sync::types::{
    ContactInfo, ExhibitorUpdate, ExistingExhibitor, FeatureFlags, NewExhibitor, OrganizationType,
};
use exhibitor_sync::{Result, SyncError};

pub const EVENT: &str = "expo-2026";
pub const OTHER_EVENT: &str = "expo-2025";

/// Builds a source file with the reference 15-row preamble and 14 columns per row
pub struct SheetBuilder {
    lines: Vec<String>,
}

impl SheetBuilder {
    pub fn new() -> Self {
        Self::with_title("Expo Exhibitor Registration Export")
    }

    /// Same layout, with the title cell quoted so it may contain line breaks
    pub fn with_title(title: &str) -> Self {
        let mut lines = vec![format!("\"{}\",,,", title.replace('"', "\"\""))];
        for i in 2..=14 {
            lines.push(format!("Preamble line {i},,,"));
        }
        lines.push(
            "Confirmed,Booth,Organization,Type,Region,Notes,Fee Waiver,Scholarship,On-Spot,Tables,Chairs,Contact,Phone,Email"
                .to_string(),
        );
        Self { lines }
    }

    pub fn row(mut self, status: &str, booth: &str, organization: &str) -> Self {
        self.lines.push(format!(
            "{status},{booth},{organization},,,,TRUE,false,,1,2,Pat Lee,555-0101,pat@example.org"
        ));
        self
    }

    pub fn build(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

pub fn source_config() -> SourceConfig {
    SourceConfig::default()
}

pub fn existing(event_id: &str, name: &str, booth: &str) -> ExistingExhibitor {
    ExistingExhibitor {
        id: Uuid::new_v4(),
        event_id: event_id.to_string(),
        organization_name: name.to_string(),
        booth: booth.to_string(),
        features: FeatureFlags::default(),
        contact: ContactInfo::default(),
        organization_type: OrganizationType::Other,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Store that rejects inserts for chosen names and updates for chosen ids
pub struct FlakyStore {
    pub inner: InMemoryDirectoryStore,
    pub failing_names: HashSet<String>,
    pub failing_ids: HashSet<Uuid>,
    pub attempts: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn new(inner: InMemoryDirectoryStore) -> Self {
        Self {
            inner,
            failing_names: HashSet::new(),
            failing_ids: HashSet::new(),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectoryStore for FlakyStore {
    async fn fetch_all(&self, event_id: &str) -> Result<Vec<ExistingExhibitor>> {
        self.inner.fetch_all(event_id).await
    }

    async fn update(&self, id: Uuid, changes: &ExhibitorUpdate) -> Result<()> {
        self.attempts.lock().unwrap().push(format!("update:{id}"));
        if self.failing_ids.contains(&id) {
            return Err(SyncError::store("write rejected"));
        }
        self.inner.update(id, changes).await
    }

    async fn insert(&self, event_id: &str, exhibitor: &NewExhibitor) -> Result<Uuid> {
        self.attempts
            .lock()
            .unwrap()
            .push(format!("insert:{}", exhibitor.organization_name));
        if self.failing_names.contains(&exhibitor.organization_name) {
            return Err(SyncError::store("write rejected"));
        }
        self.inner.insert(event_id, exhibitor).await
    }

    async fn delete_all(&self, event_id: &str) -> Result<usize> {
        self.inner.delete_all(event_id).await
    }
}

/// Store whose writes park until the test opens the gate
pub struct GatedStore {
    pub inner: InMemoryDirectoryStore,
    pub entered: Arc<Notify>,
    pub gate: Arc<Notify>,
}

impl GatedStore {
    pub fn new(inner: InMemoryDirectoryStore) -> Self {
        Self {
            inner,
            entered: Arc::new(Notify::new()),
            gate: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl DirectoryStore for GatedStore {
    async fn fetch_all(&self, event_id: &str) -> Result<Vec<ExistingExhibitor>> {
        self.inner.fetch_all(event_id).await
    }

    async fn update(&self, id: Uuid, changes: &ExhibitorUpdate) -> Result<()> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.update(id, changes).await
    }

    async fn insert(&self, event_id: &str, exhibitor: &NewExhibitor) -> Result<Uuid> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.insert(event_id, exhibitor).await
    }

    async fn delete_all(&self, event_id: &str) -> Result<usize> {
        self.inner.delete_all(event_id).await
    }
}

/// Store whose bulk delete always fails
pub struct BrokenPurgeStore {
    pub inner: InMemoryDirectoryStore,
}

#[async_trait]
impl DirectoryStore for BrokenPurgeStore {
    async fn fetch_all(&self, event_id: &str) -> Result<Vec<ExistingExhibitor>> {
        self.inner.fetch_all(event_id).await
    }

    async fn update(&self, id: Uuid, changes: &ExhibitorUpdate) -> Result<()> {
        self.inner.update(id, changes).await
    }

    async fn insert(&self, event_id: &str, exhibitor: &NewExhibitor) -> Result<Uuid> {
        self.inner.insert(event_id, exhibitor).await
    }

    async fn delete_all(&self, _event_id: &str) -> Result<usize> {
        Err(SyncError::Database {
            message: "connection reset".to_string(),
        })
    }
}
