//! Failure classification policy.
//!
//! Rust has no exception hierarchy, so deciding whether a panic is an
//! assertion failure or an unexpected error is a policy. The default policy,
//! [`PrefixClassifier`], records a failure as `error` only when its message
//! starts with one of [`DEFAULT_ERROR_PREFIXES`] (unwrapping `None` or
//! `Err`, out-of-bounds indexing, arithmetic overflow, division by zero).
//! Everything else, including `assert!(cond, "custom message")` and an
//! `Err` from `anyhow::ensure!`, is recorded as `failed`. Panics carrying an
//! [`AssertionFailure`] payload are always assertions.

use std::any::Any;
use std::fmt;

use crate::model::{Failure, FailureKind};

/// Message prefixes the default classifier records as `error`.
pub const DEFAULT_ERROR_PREFIXES: &[&str] = &[
    "called `Option::unwrap()`",
    "called `Result::unwrap()`",
    "called `Option::expect()`",
    "called `Result::expect()`",
    "index out of bounds",
    "attempt to",
    "divide by zero",
];

/// Message prefixes the default classifier records as `failed` even when
/// they also match an error prefix.
pub const DEFAULT_ASSERTION_PREFIXES: &[&str] = &["assertion"];

/// What the panic hook saw when a thread panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicCapture {
    message: String,
    location: Option<String>,
    assertion_payload: bool,
}

impl PanicCapture {
    /// Capture from a raw panic payload.
    #[must_use]
    pub fn from_payload(payload: &(dyn Any + Send), location: Option<String>) -> Self {
        let assertion = payload.downcast_ref::<AssertionFailure>();
        Self {
            message: assertion.map_or_else(|| payload_message(payload), |a| a.0.clone()),
            location,
            assertion_payload: assertion.is_some(),
        }
    }

    /// Capture built from a plain message, for panics whose payload is gone.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            assertion_payload: false,
        }
    }

    /// Rendered panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// `file:line:column` of the panic, when known.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// `true` when the payload was an [`AssertionFailure`].
    #[must_use]
    pub const fn is_assertion_payload(&self) -> bool {
        self.assertion_payload
    }

    /// Message with the location appended, as recorded on failures.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.location {
            Some(location) => format!("{} (at {location})", self.message),
            None => self.message.clone(),
        }
    }
}

/// Extract the message of a panic payload.
pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(assertion) = payload.downcast_ref::<AssertionFailure>() {
        assertion.0.clone()
    } else {
        String::from("panic with a non-string payload")
    }
}

/// Panic payload that always classifies as an assertion failure.
///
/// ```should_panic
/// std::panic::panic_any(specleft::AssertionFailure::new("total was 4, expected 5"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure(String);

impl AssertionFailure {
    /// Wrap an assertion message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decides whether a failure is an assertion or an error.
pub trait FailureClassifier: Send + Sync + fmt::Debug {
    /// Classify a panic observed while a step or test was running.
    fn classify_panic(&self, capture: &PanicCapture) -> FailureKind;

    /// Classify an `Err` returned from a step or test body.
    ///
    /// Returned errors are assertion-kind unless the classifier says
    /// otherwise.
    fn classify_error(&self, _message: &str) -> FailureKind {
        FailureKind::Assertion
    }
}

/// Build the recorded [`Failure`] for a panic.
pub(crate) fn panic_failure(
    classifier: &dyn FailureClassifier,
    capture: &PanicCapture,
) -> Failure {
    Failure::new(classifier.classify_panic(capture), capture.describe())
}

/// Classifier matching message prefixes.
///
/// Assertion prefixes are checked first, then error prefixes; a message
/// matching neither gets the `unmatched` kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixClassifier {
    assertion_prefixes: Vec<String>,
    error_prefixes: Vec<String>,
    unmatched: FailureKind,
}

impl PrefixClassifier {
    /// Build a classifier from its two prefix lists and the kind given to
    /// messages matching neither.
    #[must_use]
    pub const fn new(
        assertion_prefixes: Vec<String>,
        error_prefixes: Vec<String>,
        unmatched: FailureKind,
    ) -> Self {
        Self {
            assertion_prefixes,
            error_prefixes,
            unmatched,
        }
    }

    fn classify_message(&self, message: &str) -> FailureKind {
        let starts = |prefixes: &[String]| {
            prefixes
                .iter()
                .any(|prefix| message.starts_with(prefix.as_str()))
        };
        if starts(&self.assertion_prefixes) {
            FailureKind::Assertion
        } else if starts(&self.error_prefixes) {
            FailureKind::Error
        } else {
            self.unmatched
        }
    }
}

pub(crate) fn owned_prefixes(prefixes: &[&str]) -> Vec<String> {
    prefixes.iter().map(|prefix| (*prefix).to_owned()).collect()
}

impl Default for PrefixClassifier {
    fn default() -> Self {
        Self::new(
            owned_prefixes(DEFAULT_ASSERTION_PREFIXES),
            owned_prefixes(DEFAULT_ERROR_PREFIXES),
            FailureKind::Assertion,
        )
    }
}

impl FailureClassifier for PrefixClassifier {
    fn classify_panic(&self, capture: &PanicCapture) -> FailureKind {
        if capture.is_assertion_payload() {
            FailureKind::Assertion
        } else {
            self.classify_message(capture.message())
        }
    }

    fn classify_error(&self, message: &str) -> FailureKind {
        self.classify_message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::assert_macro("assertion failed: total == 5", FailureKind::Assertion)]
    #[case::assert_eq(
        "assertion `left == right` failed\n  left: 4\n right: 5",
        FailureKind::Assertion
    )]
    #[case::custom_assert_message("total mismatch: got 4", FailureKind::Assertion)]
    #[case::unwrap_none("called `Option::unwrap()` on a `None` value", FailureKind::Error)]
    #[case::unwrap_err("called `Result::unwrap()` on an `Err` value: 3", FailureKind::Error)]
    #[case::index("index out of bounds: the len is 3 but the index is 7", FailureKind::Error)]
    #[case::overflow("attempt to add with overflow", FailureKind::Error)]
    #[case::zero_divisor("attempt to divide by zero", FailureKind::Error)]
    fn default_policy(#[case] message: &str, #[case] expected: FailureKind) {
        let capture = PanicCapture::from_message(message);
        assert_eq!(PrefixClassifier::default().classify_panic(&capture), expected);
    }

    #[rstest]
    fn assertion_payload_always_classifies_as_assertion() {
        let payload: Box<dyn Any + Send> = Box::new(AssertionFailure::new("boom"));
        let capture = PanicCapture::from_payload(payload.as_ref(), None);
        assert!(capture.is_assertion_payload());
        assert_eq!(capture.message(), "boom");
        let strict = PrefixClassifier::new(Vec::new(), Vec::new(), FailureKind::Error);
        assert_eq!(strict.classify_panic(&capture), FailureKind::Assertion);
    }

    #[rstest]
    #[case(Box::new("static str") as Box<dyn Any + Send>, "static str")]
    #[case(Box::new(String::from("owned")) as Box<dyn Any + Send>, "owned")]
    #[case(Box::new(7_u8) as Box<dyn Any + Send>, "panic with a non-string payload")]
    fn payload_messages(#[case] payload: Box<dyn Any + Send>, #[case] expected: &str) {
        assert_eq!(payload_message(payload.as_ref()), expected);
    }

    #[rstest]
    fn unmatched_messages_follow_configuration() {
        let strict = PrefixClassifier::new(
            owned_prefixes(DEFAULT_ASSERTION_PREFIXES),
            Vec::new(),
            FailureKind::Error,
        );
        let capture = PanicCapture::from_message("anything");
        assert_eq!(strict.classify_panic(&capture), FailureKind::Error);
        assert_eq!(strict.classify_error("anything"), FailureKind::Error);
        assert_eq!(strict.classify_error("assertion failed: ok"), FailureKind::Assertion);
    }

    #[rstest]
    #[case::ensure_macro("Condition failed: `total == 5` (4 vs 5)", FailureKind::Assertion)]
    #[case::custom("expected 5 rows", FailureKind::Assertion)]
    #[case::unwrap("called `Option::unwrap()` on a `None` value", FailureKind::Error)]
    fn returned_errors_use_the_same_prefixes(#[case] message: &str, #[case] expected: FailureKind) {
        assert_eq!(PrefixClassifier::default().classify_error(message), expected);
    }

    #[rstest]
    fn assertion_prefixes_win_over_error_prefixes() {
        let classifier = PrefixClassifier::new(
            vec![String::from("attempt to login")],
            owned_prefixes(DEFAULT_ERROR_PREFIXES),
            FailureKind::Error,
        );
        let capture = PanicCapture::from_message("attempt to login was rejected");
        assert_eq!(classifier.classify_panic(&capture), FailureKind::Assertion);
    }

    #[rstest]
    fn describe_appends_location() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let location = Some(String::from("src/lib.rs:1:2"));
        let capture = PanicCapture::from_payload(payload.as_ref(), location);
        assert_eq!(capture.describe(), "boom (at src/lib.rs:1:2)");
    }
}
