//! Removal debouncing backed by a persisted per-app absence counter.
//!
//! The catalog feed regularly drops apps for about an hour before they come
//! back. An app missing from the feed is only recorded as removed once it has
//! stayed missing for `threshold + 1` consecutive runs; until then it is kept
//! in the snapshot and its counter is advanced.
use crate::catalog::AppId;
use crate::store::{read_json_optional, to_pretty_json, WriteSet};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Consecutive-absence counters keyed by app ID (string keys on disk).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemovalHistory {
    counters: BTreeMap<AppId, u32>,
}

impl RemovalHistory {
    pub fn get(&self, id: AppId) -> Option<u32> {
        self.counters.get(&id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }
}

impl FromIterator<(AppId, u32)> for RemovalHistory {
    fn from_iter<I: IntoIterator<Item = (AppId, u32)>>(iter: I) -> Self {
        Self {
            counters: iter.into_iter().collect(),
        }
    }
}

/// Outcome of one debounce pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Stabilized {
    /// Apps whose removal is accepted this run.
    pub confirmed: BTreeSet<AppId>,
    /// Apps missing this run but kept in the snapshot.
    pub deferred: BTreeSet<AppId>,
}

/// Load the history map; a missing file is an empty history.
pub fn load_history(path: &Path) -> Result<RemovalHistory> {
    Ok(read_json_optional(path)?.unwrap_or_default())
}

/// Stage a full replacement of the history file.
pub fn stage_history(writes: &mut WriteSet, path: &Path, history: &RemovalHistory) -> Result<()> {
    writes.stage(path, &to_pretty_json(history)?)
}

/// Debounce `candidates` (apps in the previous snapshot but not in `current`).
///
/// Counters of apps that reappeared are dropped. Deferred apps are re-inserted
/// into `current`; confirmed apps have their counter purged.
pub fn stabilize(
    candidates: &BTreeSet<AppId>,
    current: &mut BTreeSet<AppId>,
    history: &mut RemovalHistory,
    threshold: u32,
) -> Stabilized {
    history.counters.retain(|id, _| candidates.contains(id));

    let mut outcome = Stabilized::default();
    for &id in candidates {
        match history.counters.get(&id).copied() {
            Some(count) if count >= threshold => {
                history.counters.remove(&id);
                outcome.confirmed.insert(id);
            }
            Some(count) => {
                history.counters.insert(id, count + 1);
                current.insert(id);
                outcome.deferred.insert(id);
            }
            None => {
                history.counters.insert(id, 1);
                current.insert(id);
                outcome.deferred.insert(id);
            }
        }
    }
    tracing::debug!(
        candidates = candidates.len(),
        confirmed = outcome.confirmed.len(),
        deferred = outcome.deferred.len(),
        tracked = history.len(),
        "removal debounce complete"
    );
    outcome
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
