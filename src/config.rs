use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Event whose directory is reconciled. Overridden by `BOOTH_SYNC_EVENT_ID`.
    pub event_id: Option<String>,
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Layout of the exhibitor spreadsheet
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub preamble_rows: usize,
    pub not_attending_sentinel: String,
    pub truthy_token: String,
    pub columns: ColumnLayout,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            preamble_rows: DEFAULT_PREAMBLE_ROWS,
            not_attending_sentinel: NOT_ATTENDING_SENTINEL.to_string(),
            truthy_token: TRUTHY_TOKEN.to_string(),
            columns: ColumnLayout::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub confirmation: usize,
    pub booth: usize,
    pub organization: usize,
    pub fee_waiver: usize,
    pub scholarship: usize,
    pub on_spot_admission: usize,
    pub contact_name: usize,
    pub contact_phone: usize,
    pub contact_email: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            confirmation: COL_CONFIRMATION,
            booth: COL_BOOTH,
            organization: COL_ORGANIZATION,
            fee_waiver: COL_FEE_WAIVER,
            scholarship: COL_SCHOLARSHIP,
            on_spot_admission: COL_ON_SPOT_ADMISSION,
            contact_name: COL_CONTACT_NAME,
            contact_phone: COL_CONTACT_PHONE,
            contact_email: COL_CONTACT_EMAIL,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Json,
    Libsql,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// File used by the JSON backend. Overridden by `BOOTH_SYNC_STORE_PATH`.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_METRICS_PORT,
        }
    }
}

/// Read a variable that must be set to a non-blank value.
pub fn required_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Ok(_) => Err(SyncError::Env {
            name,
            source: std::env::VarError::NotPresent,
        }),
        Err(source) => Err(SyncError::Env { name, source }),
    }
}

impl Config {
    /// Load from `BOOTH_SYNC_CONFIG` (or `booth-sync.toml`), then apply env overrides.
    /// A missing file yields the built-in defaults.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("BOOTH_SYNC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(event_id) = std::env::var("BOOTH_SYNC_EVENT_ID") {
            if !event_id.trim().is_empty() {
                self.event_id = Some(event_id.trim().to_string());
            }
        }
        if let Ok(path) = std::env::var("BOOTH_SYNC_STORE_PATH") {
            if !path.trim().is_empty() {
                self.store.path = PathBuf::from(path.trim());
            }
        }
    }

    /// Resolve the event id, preferring an explicit CLI value.
    pub fn resolve_event_id(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.event_id.clone())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                SyncError::Config(
                    "No event id given; pass --event or set BOOTH_SYNC_EVENT_ID".to_string(),
                )
            })
    }
}
