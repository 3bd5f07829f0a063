//! Recorded outcomes: step records, test results and grouped result sets.

mod result_set;
mod step;
mod test_result;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use result_set::{FeatureResults, ResultSet, ScenarioResults, StoryResults, UNKNOWN_STORY};
pub use step::StepRecord;
pub use test_result::{PendingTest, Resolution, TestResult};

/// Outcome of a step or a whole test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Completed without failure.
    Passed,
    /// An assertion-kind failure was observed.
    Failed,
    /// Any other failure was observed.
    Error,
    /// Did not run.
    Skipped,
}

impl Status {
    const fn severity(self) -> u8 {
        match self {
            Self::Skipped => 0,
            Self::Passed => 1,
            Self::Failed => 2,
            Self::Error => 3,
        }
    }

    /// The more severe of two statuses.
    ///
    /// Severity order is `skipped < passed < failed < error`.
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    /// `true` for [`Status::Failed`] and [`Status::Error`].
    #[must_use]
    pub const fn is_failing(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }

    /// Lower-case name used in persisted records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a failure was an assertion or something unexpected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The code under test produced a wrong answer.
    Assertion,
    /// The test could not complete.
    Error,
}

impl FailureKind {
    /// Status a failure of this kind maps to.
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::Assertion => Status::Failed,
            Self::Error => Status::Error,
        }
    }
}

/// Captured summary of a failure: its kind and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Classification of the failure.
    pub kind: FailureKind,
    /// Rendered failure message.
    pub message: String,
}

impl Failure {
    /// Build a failure of `kind`.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// An assertion-kind failure.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Assertion, message)
    }

    /// An error-kind failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Error, message)
    }

    /// Status this failure maps to.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.kind.status()
    }
}
