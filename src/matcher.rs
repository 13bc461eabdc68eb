use std::collections::HashMap;
use tracing::debug;

use crate::types::ExistingExhibitor;

/// Case-insensitive, whitespace-normalized form used as the matching key.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// In-memory index of an event's directory, built once from a full fetch.
#[derive(Debug, Clone, Default)]
pub struct DirectoryIndex {
    entries: Vec<ExistingExhibitor>,
    by_name: HashMap<String, usize>,
}

impl DirectoryIndex {
    /// Index entries in fetch order. When two entries normalize to the same name the first one wins.
    pub fn new(entries: Vec<ExistingExhibitor>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            let key = normalize_name(&entry.organization_name);
            if key.is_empty() {
                continue;
            }
            if by_name.contains_key(&key) {
                debug!(
                    "Ignoring duplicate directory entry {} for '{}'",
                    entry.id, entry.organization_name
                );
                continue;
            }
            by_name.insert(key, position);
        }
        Self { entries, by_name }
    }

    pub fn find(&self, organization_name: &str) -> Option<&ExistingExhibitor> {
        self.by_name
            .get(&normalize_name(organization_name))
            .map(|&position| &self.entries[position])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
