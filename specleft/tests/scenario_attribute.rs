//! Behaviour of `#[scenario]` and `#[traced]` against the process-wide
//! session.
//!
//! Annotated helpers are called from ordinary tests so their results can be
//! inspected once they finish. `specleft.toml` next to this crate's manifest
//! sets `flush = "manual"`, so nothing is written until a test publishes.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use rstest::rstest;
use serial_test::serial;
use specleft::{
    FailureKind, Resolution, ResultStore, ScenarioRef, Session, Status, TestResult, scenario, step,
    step_with, traced, try_step,
};

fn recorded(name: &str) -> Result<Arc<TestResult>> {
    let id = format!("{}::{name}", module_path!());
    Session::global()
        .aggregator()
        .results()
        .into_iter()
        .rev()
        .find(|result| result.test_id().as_str() == id)
        .with_context(|| format!("no result recorded for {id}"))
}

#[scenario(feature_id = "CALC-1", scenario_id = "add-positive")]
fn adds_positive_numbers() {
    let mut total = 0;
    step_with("clear", || total = 0);
    step_with("add 2 and 3", || total += 2 + 3);
    let _check = step("check result");
    assert_eq!(total, 5);
}

#[scenario(feature_id = "CALC-1", scenario_id = "add-negative")]
fn adds_negative_numbers_wrongly() {
    let _s = step("check result");
    assert_eq!(-2 + -3, -6, "sum of negatives");
}

#[scenario(feature_id = "CALC-1", scenario_id = "parse-input")]
fn parses_input() -> Result<u8, String> {
    let value = try_step("parse", || "7".parse::<u8>().map_err(|e| e.to_string()))?;
    Ok(value * 2)
}

#[scenario(feature_id = "CALC-1", scenario_id = "parse-input-bad")]
fn parses_bad_input() -> Result<u8, String> {
    try_step("parse", || "seven".parse::<u8>().map_err(|e| e.to_string()))
}

#[scenario(
    feature_id = "CALC-1",
    scenario_id = "div-zero",
    skip,
    reason = "division is not implemented"
)]
fn divides_by_zero() {
    panic!("skipped bodies never run");
}

#[traced]
fn untracked_helper_check() {
    let _s = step("only step");
}

#[rstest]
#[serial]
fn scenario_tests_record_bound_results() -> Result<()> {
    adds_positive_numbers();
    let result = recorded("adds_positive_numbers")?;
    ensure!(result.status() == Status::Passed);
    ensure!(result.steps().len() == 3);
    ensure!(result.scenario_ref() == Some(&ScenarioRef::parse("CALC-1", "add-positive")?));
    ensure!(result.resolution() == Resolution::Unchecked, "no resolver configured");
    Ok(())
}

#[rstest]
#[serial]
fn assertion_failures_still_reach_the_harness() -> Result<()> {
    let outcome = catch_unwind(AssertUnwindSafe(adds_negative_numbers_wrongly));
    ensure!(outcome.is_err(), "the panic must propagate");
    let result = recorded("adds_negative_numbers_wrongly")?;
    ensure!(result.status() == Status::Failed);
    ensure!(result.failure().map(|f| f.kind) == Some(FailureKind::Assertion));
    Ok(())
}

#[rstest]
#[serial]
fn result_values_are_returned_unchanged() -> Result<()> {
    ensure!(parses_input() == Ok(14));
    ensure!(recorded("parses_input")?.status() == Status::Passed);

    ensure!(parses_bad_input().is_err());
    let result = recorded("parses_bad_input")?;
    ensure!(result.status() == Status::Failed);
    ensure!(result.steps().first().map(|s| s.status) == Some(Status::Failed));
    Ok(())
}

#[rstest]
#[serial]
fn skipped_scenarios_do_not_run_their_body() -> Result<()> {
    divides_by_zero();
    let result = recorded("divides_by_zero")?;
    ensure!(result.status() == Status::Skipped);
    ensure!(result.skip_reason() == Some("division is not implemented"));
    Ok(())
}

#[rstest]
#[serial]
fn traced_tests_are_unclassified() -> Result<()> {
    untracked_helper_check();
    let result = recorded("untracked_helper_check")?;
    ensure!(result.scenario_ref().is_none());
    ensure!(result.resolution() == Resolution::Unbound);
    let set = Session::global().finalize();
    ensure!(set.unclassified().iter().any(|r| r.test_id() == result.test_id()));
    Ok(())
}

#[rstest]
#[serial]
fn repeated_calls_keep_a_single_binding() -> Result<()> {
    adds_positive_numbers();
    adds_positive_numbers();
    let id = format!("{}::adds_positive_numbers", module_path!());
    let binding = Session::global()
        .registry()
        .lookup(&id.as_str().into())
        .context("binding registered")?;
    ensure!(binding.scenario().to_string() == "CALC-1/add-positive");
    Ok(())
}

#[rstest]
#[serial]
fn publishing_writes_the_run_record() -> Result<()> {
    adds_positive_numbers();
    let session = Session::global();
    let published = session.publish()?;
    let store = session.store().context("file store configured")?;
    let loaded = store.load(session.run_id())?;
    ensure!(loaded == *published);
    ensure!(
        loaded
            .scenario(&ScenarioRef::parse("CALC-1", "add-positive")?)
            .is_some()
    );
    Ok(())
}

#[scenario(feature_id = "CALC-1", scenario_id = "harness-test")]
#[test]
fn attribute_composes_with_test() {
    let sum = step_with("add under the harness", || 2 + 3);
    assert_eq!(sum, 5);
}
