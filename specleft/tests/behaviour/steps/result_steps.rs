//! Assertions over recorded and published results.

use anyhow::{Context, Result, anyhow, ensure};
use rstest_bdd_macros::then;
use specleft::{ResultStore, summary};

use super::step_names;
use crate::fixtures::TracingWorld;

#[then("the result for \"{test}\" has status \"{status}\"")]
fn check_status(tracing_world: &TracingWorld, test: String, status: String) -> Result<()> {
    let result = tracing_world
        .result(&test)
        .with_context(|| format!("no result for {test}"))?;
    ensure!(
        result.status().as_str() == status,
        "status of {test} is {}, expected {status}",
        result.status()
    );
    Ok(())
}

#[then("the result for \"{test}\" has the steps \"{steps}\"")]
fn check_steps(tracing_world: &TracingWorld, test: String, steps: String) -> Result<()> {
    let result = tracing_world
        .result(&test)
        .with_context(|| format!("no result for {test}"))?;
    let names: Vec<String> = result.steps().iter().map(|s| s.name.clone()).collect();
    ensure!(names == step_names(&steps), "unexpected steps {names:?}");
    Ok(())
}

#[then("the step \"{name}\" of \"{test}\" has status \"{status}\"")]
fn check_step_status(
    tracing_world: &TracingWorld,
    name: String,
    test: String,
    status: String,
) -> Result<()> {
    let result = tracing_world
        .result(&test)
        .with_context(|| format!("no result for {test}"))?;
    let record = result
        .steps()
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| anyhow!("{test} has no step named {name}"))?;
    ensure!(record.status.as_str() == status, "step {name} is {}", record.status);
    Ok(())
}

#[then("the result for \"{test}\" has resolution \"{resolution}\"")]
fn check_resolution(tracing_world: &TracingWorld, test: String, resolution: String) -> Result<()> {
    let result = tracing_world
        .result(&test)
        .with_context(|| format!("no result for {test}"))?;
    let actual = serde_json::to_value(result.resolution())?;
    ensure!(actual == resolution.as_str(), "resolution is {actual}");
    Ok(())
}

#[then("the run has {count:usize} unclassified result")]
fn check_unclassified(tracing_world: &TracingWorld, count: usize) -> Result<()> {
    let set = tracing_world.session.finalize();
    ensure!(set.unclassified().len() == count);
    ensure!(set.features().is_empty());
    Ok(())
}

#[then("the store returns {count:usize} results for the run")]
fn check_store(tracing_world: &TracingWorld, count: usize) -> Result<()> {
    let loaded = tracing_world.store.load(tracing_world.session.run_id())?;
    ensure!(loaded.len() == count, "store holds {} results", loaded.len());
    let published = tracing_world
        .published
        .get()
        .context("the run was not published")?;
    ensure!(loaded == *published);
    Ok(())
}

#[then("the published summary counts {passed:usize} passed")]
fn check_summary(tracing_world: &TracingWorld, passed: usize) -> Result<()> {
    let published = tracing_world
        .published
        .get()
        .context("the run was not published")?;
    let counts = summary(&published).totals;
    ensure!(counts.passed == passed, "summary: {counts:?}");
    Ok(())
}
