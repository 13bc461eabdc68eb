//! Operator session: parse, review, execute, with purge as a separate path.
//!
//! The session is a small state machine (`Idle -> Parsed -> Executing -> Done`,
//! plus a transient `Purging`). Guards reject an execute without a plan, a
//! second concurrent execute, and any purge while an import is running.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, instrument};

use crate::cancel::CancelFlag;
use crate::classify::ClassificationPolicy;
use crate::config::SourceConfig;
use crate::error::{Result, SyncError};
use crate::executor::{BatchExecutor, ImportResult, ProgressReporter};
use crate::matcher::DirectoryIndex;
use crate::parser::{ParsedSource, RowParser, SourceReader};
use crate::plan::ImportPlan;
use crate::purge::{purge_directory, PurgeConfirmation, PurgeOutcome};
use crate::storage::DirectoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Parsed,
    Executing,
    Done,
    Purging,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Parsed => "parsed",
            SessionState::Executing => "executing",
            SessionState::Done => "done",
            SessionState::Purging => "purging",
        };
        f.write_str(name)
    }
}

struct Inner {
    state: SessionState,
    plan: Option<ImportPlan>,
    last_result: Option<ImportResult>,
}

pub struct ImportSession {
    event_id: String,
    store: Arc<dyn DirectoryStore>,
    parser: RowParser,
    policy: ClassificationPolicy,
    cancel: CancelFlag,
    inner: Mutex<Inner>,
}

impl ImportSession {
    pub fn new(event_id: &str, store: Arc<dyn DirectoryStore>, source: SourceConfig) -> Self {
        let policy = ClassificationPolicy::new(&source.not_attending_sentinel);
        Self {
            event_id: event_id.to_string(),
            store,
            parser: RowParser::new(source),
            policy,
            cancel: CancelFlag::new(),
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                plan: None,
                last_result: None,
            }),
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn state(&self) -> SessionState {
        self.lock().map(|i| i.state).unwrap_or(SessionState::Idle)
    }

    pub fn plan(&self) -> Option<ImportPlan> {
        self.lock().ok().and_then(|i| i.plan.clone())
    }

    pub fn last_result(&self) -> Option<ImportResult> {
        self.lock().ok().and_then(|i| i.last_result.clone())
    }

    /// Handle used to cancel a running import between rows.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| SyncError::InvalidState {
            action: "access session",
            state: "poisoned".to_string(),
        })
    }

    /// Move to `to` only if the current state is one of `from`.
    fn transition(&self, action: &'static str, from: &[SessionState], to: SessionState) -> Result<()> {
        let mut inner = self.lock()?;
        if !from.contains(&inner.state) {
            return Err(SyncError::InvalidState {
                action,
                state: inner.state.to_string(),
            });
        }
        inner.state = to;
        Ok(())
    }

    fn ensure_not_busy(&self, action: &'static str) -> Result<()> {
        let state = self.state();
        if matches!(state, SessionState::Executing | SessionState::Purging) {
            return Err(SyncError::InvalidState {
                action,
                state: state.to_string(),
            });
        }
        Ok(())
    }

    /// Parse a file from disk and build a fresh plan against the current directory.
    pub async fn load_file(&self, path: &Path) -> Result<ImportPlan> {
        self.ensure_not_busy("load a source")?;
        let source = self.parser.parse_file(path)?;
        self.prepare(source).await
    }

    pub async fn load_bytes(
        &self,
        source_name: &str,
        bytes: &[u8],
        reader: &dyn SourceReader,
    ) -> Result<ImportPlan> {
        self.ensure_not_busy("load a source")?;
        let source = self.parser.parse_bytes(source_name, bytes, reader)?;
        self.prepare(source).await
    }

    #[instrument(skip(self, source), fields(event_id = %self.event_id, source = %source.source_name))]
    async fn prepare(&self, source: ParsedSource) -> Result<ImportPlan> {
        // One full fetch per session; classification never queries the store per row
        let directory = self.store.fetch_all(&self.event_id).await?;
        info!("Fetched {} existing exhibitors", directory.len());
        let index = DirectoryIndex::new(directory);
        let plan = ImportPlan::from_source(&self.event_id, &source, &index, &self.policy);

        let mut inner = self.lock()?;
        if matches!(inner.state, SessionState::Executing | SessionState::Purging) {
            return Err(SyncError::InvalidState {
                action: "load a source",
                state: inner.state.to_string(),
            });
        }
        inner.state = SessionState::Parsed;
        inner.plan = Some(plan.clone());
        inner.last_result = None;
        // A fresh plan starts uncancelled; a cancel after review stays in force
        self.cancel.reset();
        Ok(plan)
    }

    /// Apply the reviewed plan. Runs to completion unless the cancel flag trips,
    /// including a cancel issued after the plan was loaded.
    pub async fn execute(&self, progress: &dyn ProgressReporter) -> Result<ImportResult> {
        self.transition("execute", &[SessionState::Parsed], SessionState::Executing)?;
        let plan = self.lock()?.plan.clone();
        let plan = match plan {
            Some(plan) => plan,
            None => {
                self.lock()?.state = SessionState::Idle;
                return Err(SyncError::InvalidState {
                    action: "execute",
                    state: "missing plan".to_string(),
                });
            }
        };

        let executor = BatchExecutor::new(self.store.clone());
        let result = executor.execute(&plan, progress, &self.cancel).await;

        let mut inner = self.lock()?;
        inner.state = SessionState::Done;
        inner.last_result = Some(result.clone());
        Ok(result)
    }

    /// Bulk delete the event's directory. Rejected while an import is running.
    /// Any loaded plan is discarded since it was built against the old directory.
    pub async fn purge(&self, confirmation: &PurgeConfirmation) -> Result<PurgeOutcome> {
        if confirmation.event_id() != self.event_id {
            return Err(SyncError::PurgeNotConfirmed {
                event_id: self.event_id.clone(),
            });
        }
        self.transition(
            "purge",
            &[SessionState::Idle, SessionState::Parsed, SessionState::Done],
            SessionState::Purging,
        )?;

        let outcome = purge_directory(self.store.as_ref(), confirmation).await;

        let mut inner = self.lock()?;
        inner.state = SessionState::Idle;
        inner.plan = None;
        outcome
    }

    /// Drop the plan and result and return to `Idle`.
    pub fn reset(&self) -> Result<()> {
        self.ensure_not_busy("reset")?;
        let mut inner = self.lock()?;
        inner.state = SessionState::Idle;
        inner.plan = None;
        inner.last_result = None;
        Ok(())
    }
}
