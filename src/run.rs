//! One snapshot run: fetch, reconcile, guard, debounce, persist.
//!
//! All inputs are read, the new state fully computed and every output staged
//! before the first file is replaced, so a failure at any step leaves every
//! persisted file untouched.
use crate::catalog::{AppId, CatalogSource};
use crate::config::RunConfig;
use crate::history::{load_history, stabilize, stage_history};
use crate::overrides::{load_override_list, reconcile};
use crate::report::{Annotation, Summary};
use crate::store::{load_previous, stage_outputs, WriteSet};
use anyhow::Result;
use std::collections::BTreeSet;

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Snapshot unchanged; nothing but the removal history may have been written.
    NoChanges(Summary),
    /// Snapshot files were rewritten.
    Updated(Summary),
    /// The removal guard tripped; nothing was written.
    Aborted { removed: usize },
}

impl RunOutcome {
    /// Annotations to print for this outcome, in order.
    pub fn annotations(&self) -> Vec<Annotation> {
        let mut annotations = Vec::new();
        let summary = match self {
            RunOutcome::Aborted { removed } => {
                annotations.push(Annotation::Warning(format!(
                    "Unusually large number of apps removed ({removed}), ignoring changes"
                )));
                return annotations;
            }
            RunOutcome::NoChanges(summary) | RunOutcome::Updated(summary) => summary,
        };
        if let Some(threshold) = summary.threshold.filter(|_| summary.ignored > 0) {
            annotations.push(Annotation::Notice(format!(
                "Ignoring {} removed apps until they stay missing for {} consecutive runs",
                summary.ignored,
                threshold + 1
            )));
        }
        annotations.push(Annotation::Notice(match self {
            RunOutcome::Updated(summary) => summary.commit_message(),
            _ => "No changes detected".to_string(),
        }));
        annotations
    }
}

/// Execute one run against `source`.
pub fn run(config: &RunConfig, source: &dyn CatalogSource) -> Result<RunOutcome> {
    let paths = &config.paths;
    let previous = load_previous(&paths.output_path())?;
    let marketable = load_override_list(&paths.marketable_overrides_path())?;
    let unmarketable = load_override_list(&paths.unmarketable_overrides_path())?;

    let fetched = source.fetch_app_ids()?;
    let mut current = reconcile(fetched, &marketable, &unmarketable);

    let candidates: BTreeSet<AppId> = previous.difference(&current).copied().collect();
    if let Some(limit) = config.max_removals {
        if candidates.len() > limit {
            tracing::warn!(removed = candidates.len(), limit, "removal guard tripped");
            return Ok(RunOutcome::Aborted {
                removed: candidates.len(),
            });
        }
    }

    let mut summary = Summary {
        added: current.difference(&previous).count(),
        removed: candidates.len(),
        ignored: 0,
        threshold: config.removal_threshold,
    };

    let mut history_update = None;
    if let Some(threshold) = config.removal_threshold {
        let mut history = load_history(&paths.history_path())?;
        if !candidates.is_empty() || !history.is_empty() {
            let before = history.clone();
            let outcome = stabilize(&candidates, &mut current, &mut history, threshold);
            for &id in &outcome.deferred {
                tracing::debug!(appid = id, absences = history.get(id), "removal deferred");
            }
            summary.removed = outcome.confirmed.len();
            summary.ignored = outcome.deferred.len();
            if !candidates.is_empty() || history != before {
                history_update = Some(history);
            }
        }
    }

    tracing::info!(
        data_dir = %paths.data_dir().display(),
        previous = previous.len(),
        current = current.len(),
        added = summary.added,
        removed = summary.removed,
        ignored = summary.ignored,
        "snapshot diff computed"
    );

    let mut writes = WriteSet::new();
    if let Some(history) = &history_update {
        stage_history(&mut writes, &paths.history_path(), history)?;
    }
    if summary.has_changes() {
        stage_outputs(&mut writes, paths, &current)?;
    }
    if !writes.is_empty() {
        let published = writes.commit()?;
        tracing::debug!(files = published.len(), "run state published");
    }

    if summary.has_changes() {
        Ok(RunOutcome::Updated(summary))
    } else {
        Ok(RunOutcome::NoChanges(summary))
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
