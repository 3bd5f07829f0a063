//! In-process result store.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{ResultStore, decode, encode};
use crate::ids::RunId;
use crate::model::ResultSet;
use crate::{SpecleftError, SpecleftResult};

/// Keeps encoded records in memory.
///
/// Records go through the same encoding as [`super::FsResultStore`], so
/// decoding failures surface the same way.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: RwLock<BTreeMap<RunId, Vec<u8>>>,
}

impl MemoryResultStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes under `run_id`, bypassing encoding.
    pub fn insert_raw(&self, run_id: RunId, bytes: impl Into<Vec<u8>>) {
        self.records.write().insert(run_id, bytes.into());
    }

    /// Number of stored runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn origin(run_id: &RunId) -> String {
    format!("memory:{run_id}")
}

impl ResultStore for MemoryResultStore {
    fn save(&self, set: &ResultSet) -> SpecleftResult<()> {
        let bytes = encode(set)
            .map_err(|e| SpecleftError::store_write(origin(set.run_id()), e.into()))?;
        self.records.write().insert(set.run_id().clone(), bytes);
        Ok(())
    }

    fn load(&self, run_id: &RunId) -> SpecleftResult<ResultSet> {
        let bytes = self
            .records
            .read()
            .get(run_id)
            .cloned()
            .ok_or_else(|| SpecleftError::not_found(run_id))?;
        decode(&origin(run_id), run_id, &bytes)
    }

    fn list_runs(&self) -> SpecleftResult<Vec<RunId>> {
        Ok(self.records.read().keys().cloned().collect())
    }
}
