use metrics::counter;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::classify::ClassificationPolicy;
use crate::matcher::{normalize_name, DirectoryIndex};
use crate::metrics::ROWS_CLASSIFIED;
use crate::parser::ParsedSource;
use crate::types::{CandidateRecord, Classification, ImportAction};

/// A candidate together with its classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedCandidate {
    pub candidate: CandidateRecord,
    pub classification: Classification,
}

/// Match and classify every candidate against the directory index.
pub fn classify_all(
    candidates: &[CandidateRecord],
    index: &DirectoryIndex,
    policy: &ClassificationPolicy,
) -> Vec<ClassifiedCandidate> {
    candidates
        .iter()
        .map(|candidate| ClassifiedCandidate {
            candidate: candidate.clone(),
            classification: policy.classify(candidate, index.find(&candidate.organization_name)),
        })
        .collect()
}

/// Booth change for a row that will update an existing exhibitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoothDiff {
    pub existing: String,
    pub incoming: String,
    pub changed: bool,
}

impl BoothDiff {
    pub fn new(existing: &str, incoming: &str) -> Self {
        Self {
            existing: existing.to_string(),
            incoming: incoming.to_string(),
            changed: normalize_name(existing) != normalize_name(incoming),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
    pub candidate: CandidateRecord,
    pub classification: Classification,
    pub booth_diff: Option<BoothDiff>,
    /// Source row of an earlier actionable row naming the same organization
    pub duplicate_of: Option<usize>,
}

impl PlanEntry {
    pub fn action(&self) -> Option<ImportAction> {
        self.classification.action()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanCounts {
    pub total: usize,
    pub skipped: usize,
    pub to_update: usize,
    pub to_insert: usize,
    pub booth_changes: usize,
    pub duplicates: usize,
    /// Rows dropped by the parser; not part of `total`
    pub dropped_rows: usize,
}

/// Reviewable import plan. Building it has no side effects and the same
/// inputs always produce the same plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportPlan {
    pub event_id: String,
    pub source_name: String,
    pub source_fingerprint: String,
    pub entries: Vec<PlanEntry>,
    pub counts: PlanCounts,
}

impl ImportPlan {
    pub fn build(
        event_id: &str,
        source: &ParsedSource,
        classified: Vec<ClassifiedCandidate>,
        index: &DirectoryIndex,
    ) -> Self {
        let mut counts = PlanCounts {
            total: classified.len(),
            dropped_rows: source.dropped_rows,
            ..PlanCounts::default()
        };
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut entries = Vec::with_capacity(classified.len());

        for ClassifiedCandidate {
            candidate,
            classification,
        } in classified
        {
            let mut booth_diff = None;
            let mut duplicate_of = None;

            match classification {
                Classification::Skip { .. } => counts.skipped += 1,
                Classification::Insert => counts.to_insert += 1,
                Classification::Update { existing_id } => {
                    counts.to_update += 1;
                    let existing_booth = index
                        .find(&candidate.organization_name)
                        .filter(|e| e.id == existing_id)
                        .map(|e| e.booth.as_str())
                        .unwrap_or("");
                    let diff = BoothDiff::new(existing_booth, &candidate.booth);
                    if diff.changed {
                        counts.booth_changes += 1;
                    }
                    booth_diff = Some(diff);
                }
            }

            if !classification.will_skip() {
                let key = normalize_name(&candidate.organization_name);
                match first_seen.get(&key) {
                    Some(&row) => {
                        counts.duplicates += 1;
                        duplicate_of = Some(row);
                    }
                    None => {
                        first_seen.insert(key, candidate.source_row);
                    }
                }
            }

            entries.push(PlanEntry {
                candidate,
                classification,
                booth_diff,
                duplicate_of,
            });
        }

        Self {
            event_id: event_id.to_string(),
            source_name: source.source_name.clone(),
            source_fingerprint: source.fingerprint.clone(),
            entries,
            counts,
        }
    }

    /// Parse output in, plan out: index lookup, classification and aggregation in one step.
    pub fn from_source(
        event_id: &str,
        source: &ParsedSource,
        index: &DirectoryIndex,
        policy: &ClassificationPolicy,
    ) -> Self {
        let classified = classify_all(&source.candidates, index, policy);
        let plan = Self::build(event_id, source, classified, index);

        let c = &plan.counts;
        counter!(ROWS_CLASSIFIED, "outcome" => "skip").increment(c.skipped as u64);
        counter!(ROWS_CLASSIFIED, "outcome" => "update").increment(c.to_update as u64);
        counter!(ROWS_CLASSIFIED, "outcome" => "insert").increment(c.to_insert as u64);
        info!(
            "Plan for event {}: {} rows, {} to update, {} to insert, {} skipped",
            event_id, c.total, c.to_update, c.to_insert, c.skipped
        );
        if c.duplicates > 0 {
            warn!("{} rows repeat an organization already in this file", c.duplicates);
        }
        plan
    }

    pub fn skipped(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.classification.will_skip())
    }

    pub fn to_update(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries
            .iter()
            .filter(|e| e.action() == Some(ImportAction::Update))
    }

    pub fn to_insert(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries
            .iter()
            .filter(|e| e.action() == Some(ImportAction::Insert))
    }

    /// Non-skipped entries in plan order; this is what the executor applies.
    pub fn actionable(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| !e.classification.will_skip())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConfirmationStatus, ContactInfo, ExistingExhibitor, FeatureFlags, OrganizationType};
    use chrono::Utc;
    use uuid::Uuid;

    fn candidate(row: usize, name: &str, booth: &str, status: ConfirmationStatus) -> CandidateRecord {
        CandidateRecord {
            source_row: row,
            organization_name: name.to_string(),
            booth: booth.to_string(),
            status,
            features: FeatureFlags::default(),
            contact: ContactInfo::default(),
        }
    }

    fn existing(name: &str, booth: &str) -> ExistingExhibitor {
        ExistingExhibitor {
            id: Uuid::new_v4(),
            event_id: "expo".to_string(),
            organization_name: name.to_string(),
            booth: booth.to_string(),
            features: FeatureFlags::default(),
            contact: ContactInfo::default(),
            organization_type: OrganizationType::Other,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn source(candidates: Vec<CandidateRecord>) -> ParsedSource {
        ParsedSource {
            source_name: "exhibitors.csv".to_string(),
            fingerprint: "abc".to_string(),
            candidates,
            dropped_rows: 1,
        }
    }

    fn sample() -> (ParsedSource, DirectoryIndex) {
        let src = source(vec![
            candidate(16, "Acme College", "A1", ConfirmationStatus::Confirmed),
            candidate(17, "Beta Institute", "b 2", ConfirmationStatus::Confirmed),
            candidate(18, "Gamma Fund", "", ConfirmationStatus::Pending),
            candidate(19, "Delta Academy", "D4", ConfirmationStatus::Confirmed),
            candidate(20, "ACME  college", "A1", ConfirmationStatus::Confirmed),
        ]);
        let index = DirectoryIndex::new(vec![
            existing("Acme College", " a1 "),
            existing("Beta Institute", "B1"),
        ]);
        (src, index)
    }

    #[test]
    fn test_counts_and_groups() {
        let (src, index) = sample();
        let plan = ImportPlan::from_source("expo", &src, &index, &ClassificationPolicy::default());

        assert_eq!(plan.counts.total, 5);
        assert_eq!(plan.counts.skipped, 1);
        assert_eq!(plan.counts.to_update, 3);
        assert_eq!(plan.counts.to_insert, 1);
        assert_eq!(plan.counts.dropped_rows, 1);
        assert_eq!(
            plan.counts.skipped + plan.counts.to_update + plan.counts.to_insert,
            plan.counts.total
        );
        assert_eq!(plan.skipped().count(), 1);
        assert_eq!(plan.to_update().count(), 3);
        assert_eq!(plan.to_insert().next().unwrap().candidate.organization_name, "Delta Academy");

        let rows: Vec<usize> = plan.actionable().map(|e| e.candidate.source_row).collect();
        assert_eq!(rows, vec![16, 17, 19, 20]);
    }

    #[test]
    fn test_booth_diff_uses_normalized_comparison() {
        let (src, index) = sample();
        let plan = ImportPlan::from_source("expo", &src, &index, &ClassificationPolicy::default());

        let acme = plan.entries[0].booth_diff.as_ref().unwrap();
        assert!(!acme.changed);
        assert_eq!(acme.existing, " a1 ");

        let beta = plan.entries[1].booth_diff.as_ref().unwrap();
        assert!(beta.changed);
        assert_eq!(beta.incoming, "b 2");

        assert!(plan.entries[3].booth_diff.is_none());
        assert_eq!(plan.counts.booth_changes, 1);
    }

    #[test]
    fn test_duplicate_rows_are_flagged_not_reclassified() {
        let (src, index) = sample();
        let plan = ImportPlan::from_source("expo", &src, &index, &ClassificationPolicy::default());

        assert_eq!(plan.entries[4].duplicate_of, Some(16));
        assert_eq!(plan.entries[4].action(), Some(ImportAction::Update));
        assert_eq!(plan.counts.duplicates, 1);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let (src, index) = sample();
        let policy = ClassificationPolicy::default();

        let first = classify_all(&src.candidates, &index, &policy);
        let second = classify_all(&src.candidates, &index, &policy);
        assert_eq!(first, second);

        let plan_a = ImportPlan::build("expo", &src, first, &index);
        let plan_b = ImportPlan::build("expo", &src, second, &index);
        assert_eq!(plan_a, plan_b);
        assert_eq!(
            serde_json::to_string(&plan_a).unwrap(),
            serde_json::to_string(&plan_b).unwrap()
        );
    }
}
