//! Unit tests for step sealing, nesting and forced seals.

#![allow(
    unfulfilled_lint_expectations,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
#![expect(clippy::expect_used, reason = "tests panic to surface step sealing mistakes")]

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use anyhow::{Result, ensure};
use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn bound() -> Rc<StepContext> {
    let context = StepContext::new();
    context
        .bind(PendingTest::new("context::tests"))
        .expect("fresh context binds");
    context
}

fn names_and_statuses(result: &TestResult) -> Vec<(String, Status)> {
    result
        .steps()
        .iter()
        .map(|step| (step.name.clone(), step.status))
        .collect()
}

#[rstest]
fn bind_twice_is_rejected(bound: Rc<StepContext>) -> Result<()> {
    let err = bound
        .bind(PendingTest::new("other"))
        .expect_err("second bind must fail");
    ensure!(matches!(
        err,
        SpecleftError::AlreadyBound { ref test_id } if test_id == "context::tests"
    ));
    ensure!(bound.bound_test() == Some(TestId::new("context::tests")));
    Ok(())
}

#[rstest]
fn unbind_without_binding_fails() {
    let context = StepContext::new();
    assert!(matches!(context.unbind(), Err(SpecleftError::NotBound)));
    assert!(matches!(context.open_step("x", None), Err(SpecleftError::NotBound)));
}

#[rstest]
fn nested_steps_seal_in_close_order(bound: Rc<StepContext>) -> Result<()> {
    {
        let _outer = bound.open_step("outer", None)?;
        {
            let _middle = bound.open_step("middle", None)?;
            let _inner = bound.open_step("inner", None)?;
            ensure!(bound.open_depth() == 3);
        }
    }
    let result = bound.unbind()?;
    let depths: Vec<_> = result.steps().iter().map(|s| (s.name.as_str(), s.depth)).collect();
    ensure!(depths == [("inner", 2), ("middle", 1), ("outer", 0)]);
    ensure!(result.steps().iter().all(|s| s.status == Status::Passed));
    ensure!(result.status() == Status::Passed);
    Ok(())
}

#[rstest]
fn failing_child_raises_ancestors_but_not_siblings(bound: Rc<StepContext>) -> Result<()> {
    {
        let _parent = bound.open_step("parent", None)?;
        drop(bound.open_step("sibling", None)?);
        let child = bound.open_step("child", None)?;
        child.fail(Failure::assertion("wrong total"));
    }
    let result = bound.unbind()?;
    ensure!(
        names_and_statuses(&result)
            == [
                ("sibling".to_owned(), Status::Passed),
                ("child".to_owned(), Status::Failed),
                ("parent".to_owned(), Status::Failed),
            ]
    );
    ensure!(result.status() == Status::Failed);
    Ok(())
}

#[rstest]
fn panics_are_classified_while_unwinding(bound: Rc<StepContext>) -> Result<()> {
    let context = Rc::clone(&bound);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _outer = context.open_step("outer", None).expect("bound");
        let _check = context.open_step("check", None).expect("bound");
        assert_eq!(2 + 2, 5, "arithmetic");
    }));
    ensure!(outcome.is_err());
    let result = bound.unbind()?;
    ensure!(
        names_and_statuses(&result)
            == [
                ("check".to_owned(), Status::Failed),
                ("outer".to_owned(), Status::Failed),
            ]
    );
    let failure = result
        .steps()
        .first()
        .and_then(|s| s.failure.as_ref())
        .expect("check step carries the failure");
    ensure!(failure.message.starts_with("assertion"));
    Ok(())
}

#[rstest]
fn non_assertion_panics_are_errors(bound: Rc<StepContext>) -> Result<()> {
    let context = Rc::clone(&bound);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _step = context.open_step("load", None).expect("bound");
        let fixture = "missing".parse::<u8>().ok();
        #[expect(clippy::unwrap_used, reason = "unwrapping None is the error under test")]
        let _value = fixture.unwrap();
    }));
    ensure!(outcome.is_err());
    let result = bound.unbind()?;
    ensure!(names_and_statuses(&result) == [("load".to_owned(), Status::Error)]);
    ensure!(result.status() == Status::Error);
    Ok(())
}

#[rstest]
fn open_steps_are_force_sealed_on_unbind(bound: Rc<StepContext>) -> Result<()> {
    let leaked = bound.open_step("hangs", None)?;
    let result = bound.unbind()?;
    let step = result.steps().first().expect("forced record");
    ensure!(step.status == Status::Error);
    ensure!(step.attachments.get(TIMEOUT_ATTACHMENT).map(String::as_str) == Some(TIMEOUT_VALUE));
    ensure!(!leaked.is_recording());
    drop(leaked);

    bound.bind(PendingTest::new("next"))?;
    ensure!(bound.open_depth() == 0);
    drop(bound.open_step("fresh", None)?);
    let next = bound.unbind()?;
    ensure!(names_and_statuses(&next) == [("fresh".to_owned(), Status::Passed)]);
    Ok(())
}

#[rstest]
fn attachments_and_skips_are_recorded(bound: Rc<StepContext>) -> Result<()> {
    let mut initial = BTreeMap::new();
    initial.insert("input".to_owned(), "2,3".to_owned());
    {
        let guard = bound.open_step("add", Some(initial))?;
        guard.attach("output", 5);
    }
    bound.open_step("network", None)?.skip("offline");
    let result = bound.unbind()?;
    let add = result.steps().first().expect("add step");
    ensure!(add.attachments.get("input").map(String::as_str) == Some("2,3"));
    ensure!(add.attachments.get("output").map(String::as_str) == Some("5"));
    let network = result.steps().get(1).expect("network step");
    ensure!(network.status == Status::Skipped);
    ensure!(result.status() == Status::Passed);
    Ok(())
}

#[rstest]
fn fail_keeps_the_most_severe_failure(bound: Rc<StepContext>) -> Result<()> {
    {
        let guard = bound.open_step("step", None)?;
        guard.fail(Failure::error("io"));
        guard.fail(Failure::assertion("later assertion"));
    }
    let result = bound.unbind()?;
    let failure = result.steps().first().and_then(|s| s.failure.clone());
    ensure!(failure == Some(Failure::error("io")));
    Ok(())
}

#[rstest]
fn free_functions_are_inert_without_a_binding() {
    let guard = step("unbound");
    assert!(!guard.is_recording());
    assert_eq!(step_with("unbound", || 7), 7);
    let outcome: Result<(), &str> = try_step("unbound", || Err("nope"));
    assert_eq!(outcome, Err("nope"));
}

#[rstest]
fn test_level_failure_is_recorded(bound: Rc<StepContext>) -> Result<()> {
    drop(bound.open_step("ok", None)?);
    let result = bound.finish(Some(Failure::error("returned Err")))?;
    ensure!(result.status() == Status::Error);
    ensure!(result.failure().is_some());
    Ok(())
}
