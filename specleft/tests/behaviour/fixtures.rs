//! Shared fixtures for the behavioural scenarios.

use std::sync::Arc;

use rstest::fixture;
use rstest_bdd::Slot;
use specleft::{
    FlushPolicy, MemoryResultStore, ResultSet, ResultStore, RunId, ScenarioRef, Session, SpecIndex,
    SpecMetadata, TestResult,
};

/// One isolated session per scenario, with an in-memory store and a small
/// calculator spec.
pub struct TracingWorld {
    /// Session the scenario's tests run in.
    pub session: Session,
    /// Store the session publishes to.
    pub store: Arc<MemoryResultStore>,
    /// Set returned by the last explicit publish.
    pub published: Slot<Arc<ResultSet>>,
}

impl TracingWorld {
    /// Most recent result recorded for `test`.
    pub fn result(&self, test: &str) -> Option<Arc<TestResult>> {
        self.session
            .aggregator()
            .results()
            .into_iter()
            .rev()
            .find(|result| result.test_id().as_str() == test)
    }
}

fn calculator_spec() -> SpecIndex {
    ["add-positive", "add-negative"]
        .into_iter()
        .filter_map(|scenario| ScenarioRef::parse("CALC-1", scenario).ok())
        .map(|scenario| {
            let metadata = SpecMetadata {
                story_id: Some("addition".to_owned()),
                ..SpecMetadata::default()
            };
            (scenario, metadata)
        })
        .collect()
}

/// Fresh world for each scenario.
#[fixture]
pub fn tracing_world() -> TracingWorld {
    let store = Arc::new(MemoryResultStore::new());
    let mut builder = Session::builder()
        .resolver(Arc::new(calculator_spec()))
        .store(Arc::clone(&store) as Arc<dyn ResultStore>)
        .flush(FlushPolicy::Manual);
    if let Ok(run_id) = RunId::parse("behaviour") {
        builder = builder.run_id(run_id);
    }
    TracingWorld {
        session: builder.build(),
        store,
        published: Slot::default(),
    }
}
