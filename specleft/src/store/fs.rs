//! Directory-backed result store.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};

use super::{ResultStore, decode, encode};
use crate::ids::RunId;
use crate::model::ResultSet;
use crate::{SpecleftError, SpecleftResult};

const FILE_PREFIX: &str = "results_";
const FILE_SUFFIX: &str = ".json";

/// Stores each run as `results_<run_id>.json` under a root directory.
///
/// Records are written to a uniquely named hidden sibling, synced, then
/// renamed into place, so readers only ever see complete records.
#[derive(Debug)]
pub struct FsResultStore {
    root: Utf8PathBuf,
    counter: AtomicU64,
}

impl FsResultStore {
    /// Store rooted at `root`. The directory is created on first save.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Path of the record for `run_id`.
    #[must_use]
    pub fn path_for(&self, run_id: &RunId) -> Utf8PathBuf {
        self.root.join(file_name(run_id))
    }

    fn open_root(&self) -> io::Result<Dir> {
        Dir::open_ambient_dir(&self.root, ambient_authority())
    }

    fn temp_name(&self, run_id: &RunId) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!(".{}.{}.{n}.tmp", file_name(run_id), std::process::id())
    }

    fn write_atomically(&self, dir: &Dir, run_id: &RunId, bytes: &[u8]) -> io::Result<()> {
        let temp = self.temp_name(run_id);
        let written = dir.create(&temp).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        let published = written.and_then(|()| dir.rename(&temp, dir, file_name(run_id)));
        if published.is_err() {
            let _unused = dir.remove_file(&temp);
        }
        published
    }
}

fn file_name(run_id: &RunId) -> String {
    format!("{FILE_PREFIX}{run_id}{FILE_SUFFIX}")
}

fn run_id_of(name: &str) -> Option<RunId> {
    let id = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    RunId::parse(id).ok()
}

impl ResultStore for FsResultStore {
    fn save(&self, set: &ResultSet) -> SpecleftResult<()> {
        let path = self.path_for(set.run_id());
        let bytes = encode(set).map_err(|e| SpecleftError::store_write(&path, e.into()))?;
        Dir::create_ambient_dir_all(&self.root, ambient_authority())
            .and_then(|()| self.open_root())
            .and_then(|dir| self.write_atomically(&dir, set.run_id(), &bytes))
            .map_err(|e| SpecleftError::store_write(&path, e))?;
        tracing::debug!(run = %set.run_id(), path = %path, results = set.len(), "result set saved");
        Ok(())
    }

    fn load(&self, run_id: &RunId) -> SpecleftResult<ResultSet> {
        let path = self.path_for(run_id);
        let bytes = self
            .open_root()
            .and_then(|dir| dir.read(file_name(run_id)))
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SpecleftError::not_found(run_id),
                _ => SpecleftError::store_read(&path, e),
            })?;
        decode(path.as_str(), run_id, &bytes)
    }

    fn list_runs(&self) -> SpecleftResult<Vec<RunId>> {
        let dir = match self.open_root() {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SpecleftError::store_read(&self.root, e)),
        };
        let entries = dir
            .entries()
            .map_err(|e| SpecleftError::store_read(&self.root, e))?;
        let mut runs = Vec::new();
        for listed in entries {
            let entry = listed.map_err(|e| SpecleftError::store_read(&self.root, e))?;
            let Ok(name) = entry.file_name() else {
                continue;
            };
            if let Some(run_id) = run_id_of(&name) {
                runs.push(run_id);
            }
        }
        runs.sort();
        Ok(runs)
    }
}
