//! Durable persistence of result sets, one record per run.
//!
//! Records are self-describing JSON documents tagged with
//! [`SCHEMA_TAG`] and a `major.minor` [`SCHEMA_VERSION`]. Readers accept any
//! minor version of the current major and reject everything else as
//! [`SpecleftError::CorruptRecord`], so unreadable results are never confused
//! with an empty run.

mod fs;
mod memory;

use serde::{Deserialize, Serialize};

pub use fs::FsResultStore;
pub use memory::MemoryResultStore;

use crate::ids::{RunId, ScenarioRef};
use crate::model::{ResultSet, ScenarioResults};
use crate::summary::{Counts, summary};
use crate::{SpecleftError, SpecleftResult};

/// Schema tag written into every record.
pub const SCHEMA_TAG: &str = "specleft.results";

/// Version written into new records.
pub const SCHEMA_VERSION: &str = "1.0";

const SUPPORTED_MAJOR: &str = "1";

/// Persistence seam for result sets.
///
/// Saves of distinct run ids never interfere. Saving the same run id again
/// replaces the previous record; the last writer wins.
pub trait ResultStore: Send + Sync {
    /// Persist `set` under its run id.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::StoreWrite`] when the record cannot be
    /// written. A failed save never leaves a readable partial record.
    fn save(&self, set: &ResultSet) -> SpecleftResult<()>;

    /// Load the set stored under `run_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::NotFound`] when nothing is stored,
    /// [`SpecleftError::CorruptRecord`] when the record cannot be decoded and
    /// [`SpecleftError::StoreRead`] for other I/O failures.
    fn load(&self, run_id: &RunId) -> SpecleftResult<ResultSet>;

    /// Stored run ids in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::StoreRead`] when the store cannot be listed.
    fn list_runs(&self) -> SpecleftResult<Vec<RunId>>;

    /// Load the last run in [`ResultStore::list_runs`] order.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::NotFound`] when the store is empty, and the
    /// errors of [`ResultStore::load`] otherwise.
    fn latest(&self) -> SpecleftResult<ResultSet> {
        let runs = self.list_runs()?;
        let last = runs.last().ok_or_else(|| SpecleftError::not_found("latest"))?;
        self.load(last)
    }

    /// Results recorded for one scenario in one run.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`ResultStore::load`].
    fn find_scenario(
        &self,
        run_id: &RunId,
        scenario: &ScenarioRef,
    ) -> SpecleftResult<Option<ScenarioResults>> {
        Ok(self.load(run_id)?.scenario(scenario).cloned())
    }
}

#[derive(Serialize)]
struct RecordOut<'a> {
    schema: &'static str,
    version: &'static str,
    summary: Counts,
    #[serde(flatten)]
    set: &'a ResultSet,
}

#[derive(Deserialize)]
struct Envelope {
    schema: String,
    version: String,
}

/// Encode `set` as a versioned JSON record.
pub(crate) fn encode(set: &ResultSet) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec_pretty(&RecordOut {
        schema: SCHEMA_TAG,
        version: SCHEMA_VERSION,
        summary: summary(set).totals,
        set,
    })
}

/// Decode a record read from `origin`, which must belong to `expected`.
pub(crate) fn decode(origin: &str, expected: &RunId, bytes: &[u8]) -> SpecleftResult<ResultSet> {
    let envelope: Envelope =
        serde_json::from_slice(bytes).map_err(|e| SpecleftError::corrupt(origin, e))?;
    if envelope.schema != SCHEMA_TAG {
        return Err(SpecleftError::corrupt(
            origin,
            format!("unexpected schema tag '{}'", envelope.schema),
        ));
    }
    if envelope.version.split('.').next() != Some(SUPPORTED_MAJOR) {
        return Err(SpecleftError::corrupt(
            origin,
            format!("unsupported schema version '{}'", envelope.version),
        ));
    }
    let set: ResultSet =
        serde_json::from_slice(bytes).map_err(|e| SpecleftError::corrupt(origin, e))?;
    if set.run_id() != expected {
        return Err(SpecleftError::corrupt(
            origin,
            format!("record belongs to run '{}'", set.run_id()),
        ));
    }
    Ok(set)
}
