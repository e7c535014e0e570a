//! CI-facing reporting: workflow annotations and the commit message output.
use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Added/removed counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub added: usize,
    pub removed: usize,
    /// Removals deferred by the debounce this run.
    pub ignored: usize,
    /// Debounce threshold in effect, `None` when removals are trusted at once.
    pub threshold: Option<u32>,
}

impl Summary {
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.removed > 0
    }

    pub fn commit_message(&self) -> String {
        format!("Added {} apps, removed {} apps", self.added, self.removed)
    }
}

/// A workflow command line understood by the CI runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Notice(String),
    Warning(String),
    Error(String),
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (level, message) = match self {
            Annotation::Notice(message) => ("notice", message),
            Annotation::Warning(message) => ("warning", message),
            Annotation::Error(message) => ("error", message),
        };
        // Newlines would end the workflow command early.
        let message = message.replace('\n', " ");
        write!(f, "::{level}::{message}")
    }
}

/// Append `COMMIT_MESSAGE=<message>` to the CI output channel file.
pub fn append_commit_message(path: &Path, message: &str) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    writeln!(file, "COMMIT_MESSAGE={message}")
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
