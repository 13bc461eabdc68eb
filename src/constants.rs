//! Defaults for the exhibitor spreadsheet layout and classification literals.
//!
//! The column positions describe the reference registration export; they can be
//! overridden from the `[source]` section of the config file.

pub const DEFAULT_PREAMBLE_ROWS: usize = 15;

// Column positions (0-indexed)
pub const COL_CONFIRMATION: usize = 0;
pub const COL_BOOTH: usize = 1;
pub const COL_ORGANIZATION: usize = 2;
pub const COL_FEE_WAIVER: usize = 6;
pub const COL_SCHOLARSHIP: usize = 7;
pub const COL_ON_SPOT_ADMISSION: usize = 8;
pub const COL_CONTACT_NAME: usize = 11;
pub const COL_CONTACT_PHONE: usize = 12;
pub const COL_CONTACT_EMAIL: usize = 13;

/// Booth value meaning the exhibitor will not be present.
pub const NOT_ATTENDING_SENTINEL: &str = "not attending";

/// Literal accepted as "true" in boolean feature columns.
pub const TRUTHY_TOKEN: &str = "TRUE";

// Skip reasons surfaced to the operator
pub const SKIP_NO_BOOTH: &str = "no valid booth number";
pub const SKIP_NOT_CONFIRMED: &str = "confirmation status: false";
pub const SKIP_PENDING: &str = "pending confirmation";
pub const SKIP_NO_STATUS: &str = "no confirmation status";

pub const DEFAULT_CONFIG_PATH: &str = "booth-sync.toml";
pub const DEFAULT_STORE_PATH: &str = "data/directory.json";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_METRICS_PORT: u16 = 9898;
