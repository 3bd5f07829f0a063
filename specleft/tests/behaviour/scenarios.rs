//! Binds the behavioural feature files to the step registry.

use crate::fixtures::{TracingWorld, tracing_world};
use rstest_bdd_macros::scenarios;

scenarios!(
    "tests/features/step_tracing.feature",
    fixtures = [tracing_world: TracingWorld]
);
