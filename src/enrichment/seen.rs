//! Parent keys already claimed for enrichment during a run.

use crate::types::FacilityId;
use std::collections::HashSet;

/// Set of facility keys that have been claimed for enrichment
///
/// A key is claimed before its facility is fetched. Claiming is a single
/// test-and-set through `&mut self`, so two candidates sharing a new key can
/// never both win.
#[derive(Debug, Default)]
pub struct SeenKeys {
    keys: HashSet<FacilityId>,
}

impl SeenKeys {
    /// Empty set for a new run
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`; returns `false` if it was already claimed
    pub fn claim(&mut self, key: &FacilityId) -> bool {
        if self.keys.contains(key) {
            return false;
        }
        self.keys.insert(key.clone())
    }

    /// Whether `key` has been claimed
    pub fn contains(&self, key: &FacilityId) -> bool {
        self.keys.contains(key)
    }

    /// Number of claimed keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing has been claimed yet
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
