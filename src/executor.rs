use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::cancel::CancelFlag;
use crate::error::{Result, SyncError};
use crate::metrics::{BATCH_DURATION, ROWS_APPLIED, ROWS_FAILED};
use crate::org_type::classify_organization;
use crate::plan::{ImportPlan, PlanEntry};
use crate::storage::DirectoryStore;
use crate::types::{Classification, ExhibitorUpdate, ImportAction, NewExhibitor};

/// Progress after one row has been attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub organization_name: String,
    pub succeeded: bool,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed * 100) / self.total) as u8
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &Progress);
}

impl<F> ProgressReporter for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn report(&self, progress: &Progress) {
        self(progress)
    }
}

/// Reporter that discards progress
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _progress: &Progress) {}
}

/// A row whose write failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub organization_name: String,
    pub source_row: usize,
    pub message: String,
}

/// Summary of one executed batch
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub event_id: String,
    pub source_name: String,
    pub source_fingerprint: String,
    pub total: usize,
    pub updated: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
    /// Rows never attempted because the run was cancelled
    pub not_attempted: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ImportResult {
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    /// Every candidate is accounted for exactly once.
    pub fn is_balanced(&self) -> bool {
        self.updated + self.inserted + self.skipped + self.failed() + self.not_attempted == self.total
    }
}

/// Applies a plan's actionable rows one at a time, in plan order.
/// A failed row is recorded and the batch moves on.
pub struct BatchExecutor {
    store: Arc<dyn DirectoryStore>,
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("store", &"<Arc<dyn DirectoryStore>>")
            .finish()
    }
}

impl BatchExecutor {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, plan, progress, cancel), fields(event_id = %plan.event_id))]
    pub async fn execute(
        &self,
        plan: &ImportPlan,
        progress: &dyn ProgressReporter,
        cancel: &CancelFlag,
    ) -> ImportResult {
        let started_at = Utc::now();
        let t_batch = std::time::Instant::now();
        let actionable: Vec<&PlanEntry> = plan.actionable().collect();
        let total_to_process = actionable.len();

        info!(
            "Applying {} rows to event {} ({} skipped)",
            total_to_process, plan.event_id, plan.counts.skipped
        );

        let mut updated = 0;
        let mut inserted = 0;
        let mut errors = Vec::new();
        let mut not_attempted = 0;

        for (i, entry) in actionable.iter().enumerate() {
            if cancel.is_cancelled() {
                not_attempted = total_to_process - i;
                warn!("Import cancelled after {} of {} rows", i, total_to_process);
                break;
            }

            let name = &entry.candidate.organization_name;
            let succeeded = match self.apply(&plan.event_id, entry).await {
                Ok(ImportAction::Update) => {
                    updated += 1;
                    counter!(ROWS_APPLIED, "action" => "update").increment(1);
                    true
                }
                Ok(ImportAction::Insert) => {
                    inserted += 1;
                    counter!(ROWS_APPLIED, "action" => "insert").increment(1);
                    true
                }
                Err(e) => {
                    error!("Row {} ({}) failed: {}", entry.candidate.source_row, name, e);
                    counter!(ROWS_FAILED).increment(1);
                    errors.push(RowError {
                        organization_name: name.clone(),
                        source_row: entry.candidate.source_row,
                        message: e.to_string(),
                    });
                    false
                }
            };

            progress.report(&Progress {
                processed: i + 1,
                total: total_to_process,
                organization_name: name.clone(),
                succeeded,
            });
        }

        let elapsed = t_batch.elapsed();
        histogram!(BATCH_DURATION).record(elapsed.as_secs_f64());

        let result = ImportResult {
            event_id: plan.event_id.clone(),
            source_name: plan.source_name.clone(),
            source_fingerprint: plan.source_fingerprint.clone(),
            total: plan.counts.total,
            updated,
            inserted,
            skipped: plan.counts.skipped,
            errors,
            not_attempted,
            cancelled: not_attempted > 0,
            started_at,
            finished_at: Utc::now(),
            duration_ms: elapsed.as_millis() as u64,
        };

        info!(
            "Import finished: {} updated, {} inserted, {} skipped, {} failed",
            result.updated,
            result.inserted,
            result.skipped,
            result.failed()
        );
        if result.failed() > 0 {
            warn!("{} rows failed during import", result.failed());
        }
        result
    }

    async fn apply(&self, event_id: &str, entry: &PlanEntry) -> Result<ImportAction> {
        let candidate = &entry.candidate;
        match entry.classification {
            Classification::Update { existing_id } => {
                self.store
                    .update(existing_id, &ExhibitorUpdate::from(candidate))
                    .await?;
                debug!("Updated {} ({})", candidate.organization_name, existing_id);
                Ok(ImportAction::Update)
            }
            Classification::Insert => {
                let exhibitor = NewExhibitor {
                    organization_name: candidate.organization_name.clone(),
                    booth: candidate.booth.clone(),
                    features: candidate.features,
                    contact: candidate.contact.clone(),
                    organization_type: classify_organization(&candidate.organization_name),
                };
                let id = self.store.insert(event_id, &exhibitor).await?;
                debug!(
                    "Inserted {} as {} ({})",
                    candidate.organization_name,
                    exhibitor.organization_type.as_str(),
                    id
                );
                Ok(ImportAction::Insert)
            }
            Classification::Skip { reason } => Err(SyncError::store(format!(
                "skipped row reached the executor: {}",
                reason
            ))),
        }
    }
}
