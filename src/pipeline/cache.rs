//! Prefix-keyed artifact cache backed by symbolic links.
//!
//! Cache entries are named `<prefix>.<stage1>.<stage2>...<stageN>.<artifact>`
//! so a hit is conditional on the exact sequence of stages executed before
//! the artifact was produced. Entries are write-once: publishing checks for
//! an existing entry first and treats a concurrent create as a no-op, which
//! makes the cache safe to share between category-pair runs.

use crate::error::{PipelineError, PipelineResult};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache filename for an artifact produced after the given stages.
    pub fn entry_name(prefix: &str, executed: &[String], artifact: &str) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(executed.len() + 2);
        if !prefix.is_empty() {
            parts.push(prefix);
        }
        parts.extend(executed.iter().map(String::as_str));
        parts.push(artifact);
        parts.join(".")
    }

    /// Resolve a cache entry, healing broken links.
    ///
    /// A dangling symlink counts as an inconsistent cache: it is logged,
    /// removed, and reported as a miss.
    pub fn lookup(&self, name: &str) -> PipelineResult<Option<PathBuf>> {
        let path = self.dir.join(name);
        if fs::symlink_metadata(&path).is_err() {
            return Ok(None);
        }
        if fs::metadata(&path).is_err() {
            tracing::warn!(
                target: "pipeline",
                "Removing broken cache entry '{}'",
                path.display()
            );
            fs::remove_file(&path).map_err(|e| PipelineError::Cache {
                path: path.clone(),
                reason: format!("failed to remove broken entry: {e}"),
            })?;
            return Ok(None);
        }
        Ok(Some(path))
    }

    /// Install a cache entry pointing at a produced artifact.
    ///
    /// Never overwrites: an entry that appeared meanwhile (another pair run
    /// publishing the same artifact) is left alone.
    pub fn publish(&self, name: &str, target: &Path) -> PipelineResult<()> {
        let link = self.dir.join(name);
        if fs::symlink_metadata(&link).is_ok() {
            return Ok(());
        }
        let absolute = fs::canonicalize(target).map_err(|e| PipelineError::Cache {
            path: target.to_path_buf(),
            reason: format!("cannot resolve artifact for caching: {e}"),
        })?;
        match std::os::unix::fs::symlink(&absolute, &link) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(PipelineError::Cache {
                path: link,
                reason: format!("failed to create cache link: {e}"),
            }),
        }
    }
}
