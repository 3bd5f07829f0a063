//! Finished test records and the pending state they are built from.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Failure, Status, StepRecord};
use crate::classify::{FailureClassifier, PrefixClassifier};
use crate::ids::{ScenarioRef, TestId};
use crate::spec::SpecMetadata;

/// How a test's scenario binding was checked against the spec index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// The scenario is known and its metadata was copied.
    Resolved,
    /// The scenario is not known to the resolver.
    Unresolved,
    /// No resolver was configured, so the binding was not checked.
    Unchecked,
    /// The test has no scenario binding.
    Unbound,
}

/// Record of one test invocation.
///
/// Built by a [`crate::StepContext`] when the test is unbound and immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    test_id: TestId,
    #[serde(default)]
    scenario_ref: Option<ScenarioRef>,
    resolution: Resolution,
    status: Status,
    #[serde(with = "time::serde::rfc3339")]
    started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    finished_at: OffsetDateTime,
    #[serde(default)]
    steps: Vec<StepRecord>,
    #[serde(default)]
    metadata: SpecMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<Failure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    skip_reason: Option<String>,
}

impl TestResult {
    /// Minimal `error` record for a test whose hooks could not bind it.
    pub fn synthetic_error(
        test_id: TestId,
        scenario_ref: Option<ScenarioRef>,
        message: impl Into<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        let resolution = if scenario_ref.is_some() {
            Resolution::Unchecked
        } else {
            Resolution::Unbound
        };
        Self {
            test_id,
            scenario_ref,
            resolution,
            status: Status::Error,
            started_at: now,
            finished_at: now,
            steps: Vec::new(),
            metadata: SpecMetadata::default(),
            failure: Some(Failure::error(message)),
            skip_reason: None,
        }
    }

    /// Fully qualified test name.
    #[must_use]
    pub const fn test_id(&self) -> &TestId {
        &self.test_id
    }

    /// Scenario the test was bound to, if any.
    #[must_use]
    pub const fn scenario_ref(&self) -> Option<&ScenarioRef> {
        self.scenario_ref.as_ref()
    }

    /// How the binding was checked.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Derived overall status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// When the test started.
    #[must_use]
    pub const fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    /// When the test finished.
    #[must_use]
    pub const fn finished_at(&self) -> OffsetDateTime {
        self.finished_at
    }

    /// Sealed steps in close order.
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Metadata copied from the resolver at binding time.
    #[must_use]
    pub const fn metadata(&self) -> &SpecMetadata {
        &self.metadata
    }

    /// Failure observed outside any step.
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Why the test was skipped, when it was.
    #[must_use]
    pub fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_deref()
    }
}

/// A test that has started but not finished.
///
/// Handed to [`crate::StepContext::bind`]; the matching `unbind` turns it
/// into a [`TestResult`].
#[derive(Debug, Clone)]
pub struct PendingTest {
    test_id: TestId,
    scenario_ref: Option<ScenarioRef>,
    resolution: Resolution,
    metadata: SpecMetadata,
    started_at: OffsetDateTime,
    skip_reason: Option<String>,
    classifier: Arc<dyn FailureClassifier>,
}

impl PendingTest {
    /// Start an unbound test now, using the default failure classifier.
    pub fn new(test_id: impl Into<TestId>) -> Self {
        Self {
            test_id: test_id.into(),
            scenario_ref: None,
            resolution: Resolution::Unbound,
            metadata: SpecMetadata::default(),
            started_at: OffsetDateTime::now_utc(),
            skip_reason: None,
            classifier: Arc::new(PrefixClassifier::default()),
        }
    }

    /// Attach a scenario binding with the outcome of resolving it.
    #[must_use]
    pub fn with_scenario(
        mut self,
        scenario_ref: ScenarioRef,
        resolution: Resolution,
        metadata: SpecMetadata,
    ) -> Self {
        self.scenario_ref = Some(scenario_ref);
        self.resolution = resolution;
        self.metadata = metadata;
        self
    }

    /// Replace the failure classifier used for steps of this test.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Mark the test as skipped before its body runs.
    #[must_use]
    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.skip_reason = Some(reason.into());
        self
    }

    /// Name of the pending test.
    #[must_use]
    pub const fn test_id(&self) -> &TestId {
        &self.test_id
    }

    /// Scenario binding, if any.
    #[must_use]
    pub const fn scenario_ref(&self) -> Option<&ScenarioRef> {
        self.scenario_ref.as_ref()
    }

    /// Whether the test will be recorded as skipped.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.skip_reason.is_some()
    }

    pub(crate) const fn classifier(&self) -> &Arc<dyn FailureClassifier> {
        &self.classifier
    }

    pub(crate) fn finish(self, steps: Vec<StepRecord>, failure: Option<Failure>) -> TestResult {
        let status = derive_status(&steps, failure.as_ref(), self.is_skipped());
        TestResult {
            test_id: self.test_id,
            scenario_ref: self.scenario_ref,
            resolution: self.resolution,
            status,
            started_at: self.started_at,
            finished_at: OffsetDateTime::now_utc(),
            steps,
            metadata: self.metadata,
            failure,
            skip_reason: self.skip_reason,
        }
    }
}

/// Overall status from sealed steps and the test-level outcome.
///
/// `error` beats `failed`; a skipped test with no steps is `skipped`;
/// everything else is `passed`.
pub(crate) fn derive_status(
    steps: &[StepRecord],
    failure: Option<&Failure>,
    skipped: bool,
) -> Status {
    let worst = steps
        .iter()
        .map(|step| step.status)
        .chain(failure.map(Failure::status))
        .fold(Status::Skipped, Status::worst);
    if worst.is_failing() {
        worst
    } else if steps.is_empty() && skipped {
        Status::Skipped
    } else {
        Status::Passed
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use rstest::rstest;

    fn step(status: Status) -> StepRecord {
        let now = OffsetDateTime::now_utc();
        StepRecord {
            name: status.to_string(),
            status,
            depth: 0,
            started_at: now,
            finished_at: now,
            failure: None,
            attachments: BTreeMap::new(),
        }
    }

    #[rstest]
    #[case::no_steps(vec![], None, false, Status::Passed)]
    #[case::skipped(vec![], None, true, Status::Skipped)]
    #[case::all_passed(vec![Status::Passed, Status::Passed], None, false, Status::Passed)]
    #[case::one_failed(vec![Status::Passed, Status::Failed], None, false, Status::Failed)]
    #[case::error_wins(vec![Status::Failed, Status::Error], None, false, Status::Error)]
    #[case::test_level(vec![Status::Passed], Some(Failure::assertion("x")), false, Status::Failed)]
    #[case::skipped_steps_only(vec![Status::Skipped], None, false, Status::Passed)]
    fn status_derivation(
        #[case] statuses: Vec<Status>,
        #[case] failure: Option<Failure>,
        #[case] skipped: bool,
        #[case] expected: Status,
    ) {
        let steps: Vec<_> = statuses.into_iter().map(step).collect();
        assert_eq!(derive_status(&steps, failure.as_ref(), skipped), expected);
    }

    #[rstest]
    fn synthetic_error_is_unbound_without_scenario() {
        let result = TestResult::synthetic_error(TestId::new("t"), None, "hook failed");
        assert_eq!(result.status(), Status::Error);
        assert_eq!(result.resolution(), Resolution::Unbound);
        assert_eq!(result.failure().map(|f| f.message.as_str()), Some("hook failed"));
    }
}
