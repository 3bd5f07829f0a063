//! Steps that bind tests and run them through the session.

use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::{Result, ensure};
use rstest_bdd_macros::{given, when};
use specleft::step;

use super::step_names;
use crate::fixtures::TracingWorld;

#[given("the test \"{test}\" is bound to scenario \"{feature}\" \"{scenario}\"")]
fn bind_test(
    tracing_world: &TracingWorld,
    test: String,
    feature: String,
    scenario: String,
) -> Result<()> {
    tracing_world
        .session
        .registry()
        .bind_scenario(test.into(), &feature, &scenario)?;
    Ok(())
}

#[when("the test \"{test}\" runs the steps \"{steps}\"")]
fn run_steps(tracing_world: &TracingWorld, test: String, steps: String) {
    let names = step_names(&steps);
    tracing_world.session.run(test, || {
        for name in &names {
            let _step = step(name.as_str());
        }
    });
}

#[when("the test \"{test}\" fails at \"{failing}\" after the steps \"{steps}\"")]
fn run_failing_steps(
    tracing_world: &TracingWorld,
    test: String,
    failing: String,
    steps: String,
) -> Result<()> {
    let names = step_names(&steps);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        tracing_world.session.run(test, || {
            for name in &names {
                let _step = step(name.as_str());
                if *name == failing {
                    panic!("assertion failed: {name} did not hold");
                }
            }
        })
    }));
    ensure!(outcome.is_err(), "the failure must propagate to the caller");
    Ok(())
}

#[when("the run is published")]
fn publish(tracing_world: &TracingWorld) -> Result<()> {
    let set = tracing_world.session.publish()?;
    tracing_world.published.set(set);
    Ok(())
}
