use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::metrics::{PURGED_RECORDS, PURGE_RUNS};
use crate::storage::DirectoryStore;

/// Proof that the operator explicitly confirmed a purge for one event.
/// It can only be obtained by echoing the event id back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeConfirmation {
    event_id: String,
}

impl PurgeConfirmation {
    pub fn confirm(event_id: &str, typed: &str) -> Result<Self> {
        if event_id.trim().is_empty() || typed.trim() != event_id.trim() {
            return Err(SyncError::PurgeNotConfirmed {
                event_id: event_id.to_string(),
            });
        }
        Ok(Self {
            event_id: event_id.trim().to_string(),
        })
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeOutcome {
    pub event_id: String,
    pub deleted: usize,
    pub purged_at: DateTime<Utc>,
}

/// Delete every directory record of the confirmed event in one bulk call.
/// There is no rollback: on failure the directory is whatever the store left.
#[instrument(skip(store, confirmation), fields(event_id = %confirmation.event_id()))]
pub async fn purge_directory(
    store: &dyn DirectoryStore,
    confirmation: &PurgeConfirmation,
) -> Result<PurgeOutcome> {
    let event_id = confirmation.event_id();
    warn!("Purging directory for event {}", event_id);
    counter!(PURGE_RUNS).increment(1);

    let deleted = store.delete_all(event_id).await.map_err(|e| {
        error!("Purge failed for event {}: {}", event_id, e);
        SyncError::Purge {
            event_id: event_id.to_string(),
            message: e.to_string(),
        }
    })?;

    counter!(PURGED_RECORDS).increment(deleted as u64);
    info!("Purged {} records from event {}", deleted, event_id);
    Ok(PurgeOutcome {
        event_id: event_id.to_string(),
        deleted,
        purged_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_requires_matching_event() {
        assert!(PurgeConfirmation::confirm("expo-2026", "expo-2026").is_ok());
        assert!(PurgeConfirmation::confirm("expo-2026", " expo-2026\n").is_ok());
        assert!(matches!(
            PurgeConfirmation::confirm("expo-2026", "yes"),
            Err(SyncError::PurgeNotConfirmed { .. })
        ));
        assert!(PurgeConfirmation::confirm("", "").is_err());
    }
}
