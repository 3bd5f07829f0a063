//! Step-level tracing of behavioural specifications through test runs.
//!
//! Tests are bound to spec scenarios (`CALC-1/add-positive`) with the
//! [`scenario`] attribute, emit named steps while they run, and have their
//! outcomes grouped feature → story → scenario into a [`ResultSet`] that is
//! persisted per run.
//!
//! ```no_run
//! use specleft::{scenario, step};
//!
//! #[scenario(feature_id = "CALC-1", scenario_id = "add-positive")]
//! #[test]
//! fn adds_positive_numbers() {
//!     let mut total = 0;
//!     {
//!         let _s = step("clear");
//!         total = 0;
//!     }
//!     specleft::step_with("add 2 and 3", || total += 2 + 3);
//!     let _s = step("check result");
//!     assert_eq!(total, 5);
//! }
//! ```
//!
//! The library never decides whether a test passes. Panics keep unwinding
//! and `Err` values are returned unchanged; this crate only records them.

pub use specleft_macros::{scenario, traced};

mod aggregate;
mod binding;
mod classify;
mod config;
mod context;
mod error;
mod hooks;
mod ids;
mod model;
mod session;
mod spec;
mod store;
mod summary;

pub use aggregate::Aggregator;
pub use binding::{Binding, Registry, ScenarioDecl};
pub use classify::{
    AssertionFailure, DEFAULT_ASSERTION_PREFIXES, DEFAULT_ERROR_PREFIXES, FailureClassifier,
    PanicCapture, PrefixClassifier,
};
pub use config::{
    ClassifierConfig, DEFAULT_RESULTS_DIR, ENV_PREFIX, FILE_NAME, FlushPolicy, ListEnv,
    TraceConfig, UnmatchedPanic,
};
pub use context::{
    StepContext, StepGuard, TIMEOUT_ATTACHMENT, TIMEOUT_VALUE, reinstall_panic_hook, skip_step,
    step, step_with, try_step,
};
pub use error::{SpecleftError, SpecleftResult};
pub use hooks::{Outcome, TestGuard};
pub use ids::{FeatureId, IdentifierKind, MAX_RUN_ID_LEN, RunId, ScenarioId, ScenarioRef, TestId};
pub use model::{
    Failure, FailureKind, FeatureResults, PendingTest, Resolution, ResultSet, ScenarioResults,
    Status, StepRecord, StoryResults, TestResult, UNKNOWN_STORY,
};
pub use session::{Session, SessionBuilder};
pub use spec::{
    ExecutionTime, FilterRejection, Priority, SpecIndex, SpecMetadata, SpecResolver, TagFilter,
    sanitize_marker_name,
};
pub use store::{FsResultStore, MemoryResultStore, ResultStore, SCHEMA_TAG, SCHEMA_VERSION};
pub use summary::{Counts, FeatureSummary, ScenarioSummary, StorySummary, Summary, summary};
