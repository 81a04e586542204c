use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::WorkforcePlanError;
use crate::model::entry::{EntryKey, MonthlyEntry};
use crate::WorkforcePlanResult;

/// Unsaved local edits keyed by (role, level, month, year).
///
/// Edits supersede recorded entries during resolution; they are never written
/// back into the recorded dataset. Passed explicitly to every call that
/// resolves entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MonthlyEntry>", into = "Vec<MonthlyEntry>")]
pub struct OverrideStore {
    edits: BTreeMap<EntryKey, MonthlyEntry>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit, returning the edit it supersedes, if any.
    pub fn apply(&mut self, entry: MonthlyEntry) -> WorkforcePlanResult<Option<MonthlyEntry>> {
        entry.validate()?;
        Ok(self.edits.insert(entry.key(), entry))
    }

    /// Drop the edit for `key`, e.g. after it has been persisted or reverted.
    pub fn discard(&mut self, key: &EntryKey) -> Option<MonthlyEntry> {
        self.edits.remove(key)
    }

    pub fn get(&self, key: &EntryKey) -> Option<&MonthlyEntry> {
        self.edits.get(key)
    }

    pub fn dirty_keys(&self) -> impl Iterator<Item = &EntryKey> {
        self.edits.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonthlyEntry> {
        self.edits.values()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

impl TryFrom<Vec<MonthlyEntry>> for OverrideStore {
    type Error = WorkforcePlanError;

    fn try_from(entries: Vec<MonthlyEntry>) -> Result<Self, Self::Error> {
        let mut store = OverrideStore::new();
        for entry in entries {
            store.apply(entry)?;
        }
        Ok(store)
    }
}

impl From<OverrideStore> for Vec<MonthlyEntry> {
    fn from(store: OverrideStore) -> Self {
        store.edits.into_values().collect()
    }
}
