//! Scratch directories for result-store tests.

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// Temporary directory with a UTF-8 path, removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    _dir: TempDir,
    path: Utf8PathBuf,
}

impl ScratchDir {
    /// Create a fresh directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or its path is
    /// not UTF-8.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create scratch dir")?;
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|p| anyhow!("scratch dir is not UTF-8: {}", p.display()))?;
        Ok(Self { _dir: dir, path })
    }

    /// Path of the directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// `name` inside the directory.
    #[must_use]
    pub fn join(&self, name: &str) -> Utf8PathBuf {
        self.path.join(name)
    }

    /// Names of the entries directly inside `dir`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` cannot be listed.
    pub fn entries(dir: &Utf8Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for listed in std::fs::read_dir(dir).with_context(|| format!("list {dir}"))? {
            let entry = listed.with_context(|| format!("read entry in {dir}"))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
