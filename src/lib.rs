pub mod cancel;
pub mod classify;
pub mod config;
pub mod constants;
#[cfg(feature = "db")]
pub mod db;
pub mod error;
pub mod executor;
pub mod logging;
pub mod matcher;
pub mod metrics;
pub mod org_type;
pub mod parser;
pub mod plan;
pub mod purge;
pub mod report;
pub mod session;
pub mod storage;
pub mod types;

pub use error::{Result, SyncError};
pub use executor::{BatchExecutor, ImportResult};
pub use plan::ImportPlan;
pub use session::{ImportSession, SessionState};
pub use storage::DirectoryStore;
