//! Test boundary hooks.
//!
//! [`TestGuard`] brackets one test: it binds the thread's
//! [`StepContext`] when created and records the finished [`TestResult`]
//! when it is finished or dropped. Success, assertion failure and unexpected
//! failure all take the same path. Panics are observed, never caught.

use std::fmt::Debug;
use std::rc::Rc;
use std::thread;

use crate::SpecleftError;
use crate::classify::FailureClassifier;
use crate::context::StepContext;
use crate::ids::{ScenarioRef, TestId};
use crate::model::{Failure, PendingTest, TestResult};
use crate::session::Session;

/// A value a test body returns, inspected for a test-level failure.
pub trait Outcome {
    /// The failure this outcome represents, if any.
    fn failure(&self, classifier: &dyn FailureClassifier) -> Option<Failure>;
}

impl Outcome for () {
    fn failure(&self, _classifier: &dyn FailureClassifier) -> Option<Failure> {
        None
    }
}

impl<T, E: Debug> Outcome for Result<T, E> {
    fn failure(&self, classifier: &dyn FailureClassifier) -> Option<Failure> {
        self.as_ref().err().map(|error| {
            let message = format!("{error:?}");
            Failure::new(classifier.classify_error(&message), message)
        })
    }
}

enum GuardState {
    Bound {
        test_id: TestId,
        scenario: Option<ScenarioRef>,
    },
    Skipped(PendingTest),
    Broken {
        test_id: TestId,
        scenario: Option<ScenarioRef>,
        error: SpecleftError,
    },
    Done,
}

/// Scope of one traced test. Dropping it records the result.
#[must_use = "dropping the guard finishes the test immediately"]
pub struct TestGuard<'s> {
    session: &'s Session,
    context: Rc<StepContext>,
    state: GuardState,
}

impl<'s> TestGuard<'s> {
    pub(crate) fn bound(
        session: &'s Session,
        context: Rc<StepContext>,
        test_id: TestId,
        scenario: Option<ScenarioRef>,
    ) -> Self {
        Self {
            session,
            context,
            state: GuardState::Bound { test_id, scenario },
        }
    }

    pub(crate) fn skipped(
        session: &'s Session,
        context: Rc<StepContext>,
        pending: PendingTest,
    ) -> Self {
        Self {
            session,
            context,
            state: GuardState::Skipped(pending),
        }
    }

    pub(crate) fn broken(
        session: &'s Session,
        context: Rc<StepContext>,
        test_id: TestId,
        scenario: Option<ScenarioRef>,
        error: SpecleftError,
    ) -> Self {
        Self {
            session,
            context,
            state: GuardState::Broken {
                test_id,
                scenario,
                error,
            },
        }
    }

    /// `true` when the test body must not run.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self.state, GuardState::Skipped(_))
    }

    /// The hook error that prevented binding, if any.
    #[must_use]
    pub const fn binding_error(&self) -> Option<&SpecleftError> {
        match &self.state {
            GuardState::Broken { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Fail the test when its binding could not be established.
    ///
    /// # Panics
    ///
    /// Panics with the binding error so the harness reports the test as
    /// failed. The guard still records a synthetic `error` result.
    pub fn check_binding(&self) {
        if let Some(error) = self.binding_error() {
            panic!("specleft could not bind this test: {error}");
        }
    }

    /// Context the test's steps are recorded in.
    #[must_use]
    pub fn context(&self) -> &Rc<StepContext> {
        &self.context
    }

    /// Finish the test using the value its body returned.
    pub fn observe<R: Outcome>(mut self, outcome: &R) {
        let failure = outcome.failure(self.session.classifier());
        self.complete(failure);
    }

    /// Run the test body and finish with the value it returns.
    ///
    /// A panic in `body` unwinds through the guard, which records it as the
    /// test's failure before the harness sees it.
    pub fn run<R: Outcome>(self, body: impl FnOnce() -> R) -> R {
        let outcome = body();
        self.observe(&outcome);
        outcome
    }

    /// Finish the test with an explicit test-level failure.
    pub fn finish(mut self, failure: Option<Failure>) {
        self.complete(failure);
    }

    fn complete(&mut self, failure: Option<Failure>) {
        let result = match std::mem::replace(&mut self.state, GuardState::Done) {
            GuardState::Done => return,
            GuardState::Bound { test_id, scenario } => {
                self.context.finish(failure).unwrap_or_else(|error| {
                    tracing::warn!(
                        test = %test_id,
                        %error,
                        "test was unbound before its hook finished"
                    );
                    TestResult::synthetic_error(test_id, scenario, error.to_string())
                })
            }
            GuardState::Skipped(pending) => pending.finish(Vec::new(), None),
            GuardState::Broken {
                test_id,
                scenario,
                error,
            } => TestResult::synthetic_error(test_id, scenario, error.to_string()),
        };
        self.session.record(result);
    }
}

impl Drop for TestGuard<'_> {
    fn drop(&mut self) {
        let failure = if thread::panicking() {
            self.context.panic_failure()
        } else {
            None
        };
        self.complete(failure);
    }
}
