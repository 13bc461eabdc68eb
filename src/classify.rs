use crate::constants::NOT_ATTENDING_SENTINEL;
use crate::matcher::normalize_name;
use crate::types::{CandidateRecord, Classification, ConfirmationStatus, ExistingExhibitor, SkipReason};

/// Decides SKIP / INSERT / UPDATE for a candidate. Rules run in order and the
/// first one that applies wins, so only one skip reason is ever reported.
#[derive(Debug, Clone)]
pub struct ClassificationPolicy {
    not_attending_sentinel: String,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self::new(NOT_ATTENDING_SENTINEL)
    }
}

impl ClassificationPolicy {
    pub fn new(not_attending_sentinel: &str) -> Self {
        Self {
            not_attending_sentinel: normalize_name(not_attending_sentinel),
        }
    }

    pub fn classify(
        &self,
        candidate: &CandidateRecord,
        matched: Option<&ExistingExhibitor>,
    ) -> Classification {
        if let Some(reason) = self.skip_reason(candidate) {
            return Classification::Skip { reason };
        }
        match matched {
            Some(existing) => Classification::Update {
                existing_id: existing.id,
            },
            None => Classification::Insert,
        }
    }

    fn skip_reason(&self, candidate: &CandidateRecord) -> Option<SkipReason> {
        if !self.has_valid_booth(&candidate.booth) {
            return Some(SkipReason::NoValidBooth);
        }
        match candidate.status {
            ConfirmationStatus::NotConfirmed => Some(SkipReason::NotConfirmed),
            ConfirmationStatus::Pending => Some(SkipReason::PendingConfirmation),
            ConfirmationStatus::Unspecified => Some(SkipReason::NoConfirmationStatus),
            ConfirmationStatus::Confirmed => None,
        }
    }

    fn has_valid_booth(&self, booth: &str) -> bool {
        let booth = normalize_name(booth);
        !booth.is_empty() && booth != self.not_attending_sentinel
    }
}
