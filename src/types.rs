use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::constants::{SKIP_NOT_CONFIRMED, SKIP_NO_BOOTH, SKIP_NO_STATUS, SKIP_PENDING};

/// Confirmation column of the exhibitor spreadsheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationStatus {
    Confirmed,
    NotConfirmed,
    Pending,
    Unspecified,
}

impl ConfirmationStatus {
    /// Parse the raw cell. Unknown tokens count as unspecified rather than confirmed.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TRUE" | "YES" | "Y" | "CONFIRMED" => ConfirmationStatus::Confirmed,
            "FALSE" | "NO" | "N" => ConfirmationStatus::NotConfirmed,
            "PENDING" => ConfirmationStatus::Pending,
            _ => ConfirmationStatus::Unspecified,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub fee_waiver: bool,
    pub scholarship_offer: bool,
    pub on_spot_admission: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// One parsed source row, not yet classified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// 1-based row number in the source file
    pub source_row: usize,
    pub organization_name: String,
    pub booth: String,
    pub status: ConfirmationStatus,
    pub features: FeatureFlags,
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    NoValidBooth,
    NotConfirmed,
    PendingConfirmation,
    NoConfirmationStatus,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoValidBooth => SKIP_NO_BOOTH,
            SkipReason::NotConfirmed => SKIP_NOT_CONFIRMED,
            SkipReason::PendingConfirmation => SKIP_PENDING,
            SkipReason::NoConfirmationStatus => SKIP_NO_STATUS,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportAction {
    Insert,
    Update,
}

impl fmt::Display for ImportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportAction::Insert => f.pad("INSERT"),
            ImportAction::Update => f.pad("UPDATE"),
        }
    }
}

/// Outcome of the classification policy for one candidate.
///
/// An action exists only when the row is not skipped, and a matched id exists
/// only for updates, so the variants carry exactly the data each case allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    Skip { reason: SkipReason },
    Insert,
    Update { existing_id: Uuid },
}

impl Classification {
    pub fn will_skip(&self) -> bool {
        matches!(self, Classification::Skip { .. })
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Classification::Skip { reason } => Some(*reason),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<ImportAction> {
        match self {
            Classification::Skip { .. } => None,
            Classification::Insert => Some(ImportAction::Insert),
            Classification::Update { .. } => Some(ImportAction::Update),
        }
    }

    pub fn matched_existing_id(&self) -> Option<Uuid> {
        match self {
            Classification::Update { existing_id } => Some(*existing_id),
            _ => None,
        }
    }
}

/// Organization category derived from the name when a new exhibitor is inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationType {
    Military,
    University,
    Hbcu,
    Foundation,
    Other,
}

impl OrganizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationType::Military => "military",
            OrganizationType::University => "university",
            OrganizationType::Hbcu => "hbcu",
            OrganizationType::Foundation => "foundation",
            OrganizationType::Other => "other",
        }
    }

    pub fn from_str_lossy(raw: &str) -> Self {
        match raw {
            "military" => OrganizationType::Military,
            "university" => OrganizationType::University,
            "hbcu" => OrganizationType::Hbcu,
            "foundation" => OrganizationType::Foundation,
            _ => OrganizationType::Other,
        }
    }
}

/// A directory entry already persisted for an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingExhibitor {
    pub id: Uuid,
    pub event_id: String,
    pub organization_name: String,
    pub booth: String,
    pub features: FeatureFlags,
    pub contact: ContactInfo,
    pub organization_type: OrganizationType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Arguments for inserting an exhibitor into the directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExhibitor {
    pub organization_name: String,
    pub booth: String,
    pub features: FeatureFlags,
    pub contact: ContactInfo,
    pub organization_type: OrganizationType,
}

/// Fields an import is allowed to change on a matched exhibitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhibitorUpdate {
    pub booth: String,
    pub features: FeatureFlags,
    pub contact: ContactInfo,
}

impl From<&CandidateRecord> for ExhibitorUpdate {
    fn from(candidate: &CandidateRecord) -> Self {
        Self {
            booth: candidate.booth.clone(),
            features: candidate.features,
            contact: candidate.contact.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_status_parse() {
        assert_eq!(ConfirmationStatus::parse("TRUE"), ConfirmationStatus::Confirmed);
        assert_eq!(ConfirmationStatus::parse(" true "), ConfirmationStatus::Confirmed);
        assert_eq!(ConfirmationStatus::parse("y"), ConfirmationStatus::Confirmed);
        assert_eq!(ConfirmationStatus::parse("Confirmed"), ConfirmationStatus::Confirmed);
        assert_eq!(ConfirmationStatus::parse("FALSE"), ConfirmationStatus::NotConfirmed);
        assert_eq!(ConfirmationStatus::parse("n"), ConfirmationStatus::NotConfirmed);
        assert_eq!(ConfirmationStatus::parse("No"), ConfirmationStatus::NotConfirmed);
        assert_eq!(ConfirmationStatus::parse("Pending"), ConfirmationStatus::Pending);
        assert_eq!(ConfirmationStatus::parse(""), ConfirmationStatus::Unspecified);
        assert_eq!(ConfirmationStatus::parse("maybe"), ConfirmationStatus::Unspecified);
    }

    #[test]
    fn test_classification_accessors() {
        let skip = Classification::Skip {
            reason: SkipReason::PendingConfirmation,
        };
        assert!(skip.will_skip());
        assert_eq!(skip.skip_reason(), Some(SkipReason::PendingConfirmation));
        assert_eq!(skip.action(), None);
        assert_eq!(skip.matched_existing_id(), None);

        let id = Uuid::new_v4();
        let update = Classification::Update { existing_id: id };
        assert!(!update.will_skip());
        assert_eq!(update.skip_reason(), None);
        assert_eq!(update.action(), Some(ImportAction::Update));
        assert_eq!(update.matched_existing_id(), Some(id));

        assert_eq!(Classification::Insert.action(), Some(ImportAction::Insert));
        assert_eq!(Classification::Insert.matched_existing_id(), None);
    }

    #[test]
    fn test_skip_reason_text() {
        assert_eq!(SkipReason::NoValidBooth.to_string(), "no valid booth number");
        assert_eq!(SkipReason::NotConfirmed.to_string(), "confirmation status: false");
    }
}
