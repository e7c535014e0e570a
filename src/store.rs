//! Persisted snapshot files.
//!
//! A run's writes are staged into temp files beside their destinations and
//! only renamed into place once every file of the run has been staged.
use crate::catalog::AppId;
use crate::config::RunPaths;
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Read and decode a JSON file, returning `None` when it does not exist.
pub fn read_json_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    let value =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(value))
}

/// Load the previous run's snapshot; a missing file is an empty set.
pub fn load_previous(path: &Path) -> Result<BTreeSet<AppId>> {
    let ids: Option<Vec<AppId>> = read_json_optional(path)?;
    Ok(ids.unwrap_or_default().into_iter().collect())
}

/// Stage the snapshot as minified and pretty (indent 4) JSON arrays.
///
/// The pretty file is the next run's baseline, so it is staged last and
/// therefore published last.
pub fn stage_outputs(
    writes: &mut WriteSet,
    paths: &RunPaths,
    ids: &BTreeSet<AppId>,
) -> Result<()> {
    let sorted: Vec<AppId> = ids.iter().copied().collect();
    let minified = serde_json::to_vec(&sorted).context("serialize minified snapshot")?;
    writes.stage(&paths.output_min_path(), &minified)?;
    writes.stage(&paths.output_path(), &to_pretty_json(&sorted)?)?;
    Ok(())
}

/// Serialize with the four-space indentation used by the snapshot files.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .context("serialize pretty JSON")?;
    Ok(buf)
}

struct StagedFile {
    tmp: NamedTempFile,
    dest: PathBuf,
}

/// A group of file replacements published together.
///
/// Every file is fully written to a temp file next to its destination before
/// any destination is touched. `commit` renames them in staging order and
/// restores already-published files if a later rename fails.
#[derive(Default)]
pub struct WriteSet {
    staged: Vec<StagedFile>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Write `bytes` to a temp file that will replace `path` on commit.
    pub fn stage(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        if path.is_dir() {
            return Err(anyhow!("stage {}: destination is a directory", path.display()));
        }
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        let mut tmp =
            NamedTempFile::new_in(parent).with_context(|| format!("stage {}", path.display()))?;
        tmp.write_all(bytes)
            .with_context(|| format!("write {}", path.display()))?;
        tmp.as_file()
            .sync_all()
            .with_context(|| format!("sync {}", path.display()))?;
        self.staged.push(StagedFile {
            tmp,
            dest: path.to_path_buf(),
        });
        Ok(())
    }

    /// Publish every staged file, rolling back on the first failure.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        let mut published: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::new();
        for StagedFile { tmp, dest } in self.staged {
            let prior = match fs::read(&dest) {
                Ok(bytes) => Some(bytes),
                Err(err) if err.kind() == ErrorKind::NotFound => None,
                Err(err) => {
                    rollback(&published);
                    return Err(err).with_context(|| format!("read {}", dest.display()));
                }
            };
            if let Err(err) = tmp.persist(&dest) {
                rollback(&published);
                return Err(err.error).with_context(|| format!("publish {}", dest.display()));
            }
            published.push((dest, prior));
        }
        Ok(published.into_iter().map(|(dest, _)| dest).collect())
    }
}

fn rollback(published: &[(PathBuf, Option<Vec<u8>>)]) {
    for (dest, prior) in published.iter().rev() {
        let restored = match prior {
            Some(bytes) => fs::write(dest, bytes),
            None => fs::remove_file(dest),
        };
        if let Err(err) = restored {
            tracing::error!(path = %dest.display(), error = %err, "rollback failed");
        }
    }
}
