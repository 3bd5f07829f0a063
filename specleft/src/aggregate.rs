//! Collects finished test results and groups them into result sets.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::SpecleftResult;
use crate::ids::RunId;
use crate::model::{ResultSet, TestResult};
use crate::store::ResultStore;

#[derive(Default)]
struct State {
    results: Vec<Arc<TestResult>>,
    revision: u64,
    finalized: HashMap<RunId, (u64, Arc<ResultSet>)>,
}

/// Thread-safe accumulator of one run's test results.
///
/// The lock is held only to append a result or to copy the current list;
/// grouping and I/O happen outside it.
#[derive(Default)]
pub struct Aggregator {
    state: Mutex<State>,
}

impl Aggregator {
    /// Empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished result. Results keep completion order.
    pub fn add(&self, result: TestResult) {
        let mut state = self.state.lock();
        state.results.push(Arc::new(result));
        state.revision += 1;
    }

    /// Number of collected results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().results.len()
    }

    /// `true` when nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().results.is_empty()
    }

    /// Snapshot of the collected results in completion order.
    #[must_use]
    pub fn results(&self) -> Vec<Arc<TestResult>> {
        self.state.lock().results.clone()
    }

    /// Group everything collected so far into a result set for `run_id`.
    ///
    /// Repeated calls with no `add` in between return the same set without
    /// regrouping.
    #[must_use]
    pub fn finalize(&self, run_id: &RunId) -> Arc<ResultSet> {
        let (revision, snapshot) = {
            let state = self.state.lock();
            if let Some((revision, set)) = state.finalized.get(run_id) {
                if *revision == state.revision {
                    return Arc::clone(set);
                }
            }
            (state.revision, state.results.clone())
        };
        let set = Arc::new(ResultSet::from_results(
            run_id.clone(),
            snapshot.iter().map(|result| TestResult::clone(result)),
        ));
        let mut state = self.state.lock();
        match state.finalized.get(run_id) {
            Some((cached, existing)) if *cached >= revision => Arc::clone(existing),
            _ => {
                state
                    .finalized
                    .insert(run_id.clone(), (revision, Arc::clone(&set)));
                set
            }
        }
    }

    /// Finalise `run_id` and save the set to `store`.
    ///
    /// # Errors
    ///
    /// Returns the store's error when saving fails.
    pub fn publish(
        &self,
        run_id: &RunId,
        store: &dyn ResultStore,
    ) -> SpecleftResult<Arc<ResultSet>> {
        let set = self.finalize(run_id);
        store.save(&set)?;
        Ok(set)
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("results", &self.len())
            .finish_non_exhaustive()
    }
}
