//! Identifier grammars for features, scenarios, tests and runs.
//!
//! Feature identifiers are upper-case (`CALC-1`), scenario identifiers are
//! lower-case (`add-positive`). Both are validated on construction and on
//! deserialisation, so a value of these types is always well formed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::{SpecleftError, SpecleftResult};

/// Longest accepted run identifier, in bytes.
pub const MAX_RUN_ID_LEN: usize = 128;

/// Which identifier grammar a value was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    /// Upper-case feature identifier.
    Feature,
    /// Lower-case scenario identifier.
    Scenario,
    /// Run identifier used to key stored results.
    Run,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Feature => "feature_id",
            Self::Scenario => "scenario_id",
            Self::Run => "run_id",
        })
    }
}

fn check_grammar(
    kind: IdentifierKind,
    value: &str,
    allowed: impl Fn(char) -> bool,
    reason: &'static str,
) -> SpecleftResult<()> {
    if value.is_empty() {
        return Err(SpecleftError::invalid_identifier(
            kind,
            value,
            "must not be empty",
        ));
    }
    if value.chars().all(allowed) {
        Ok(())
    } else {
        Err(SpecleftError::invalid_identifier(kind, value, reason))
    }
}

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $allowed:expr, $reason:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validates `value` and wraps it.
            ///
            /// # Errors
            ///
            /// Returns [`SpecleftError::InvalidIdentifier`] when `value` does
            /// not match the grammar.
            pub fn parse(value: impl Into<String>) -> SpecleftResult<Self> {
                let text = value.into();
                check_grammar($kind, &text, $allowed, $reason)?;
                Ok(Self(text))
            }

            /// Borrow the identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = SpecleftError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl FromStr for $name {
            type Err = SpecleftError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_identifier!(
    /// Upper-case feature identifier such as `CALC-1`.
    FeatureId,
    IdentifierKind::Feature,
    |c: char| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-',
    "only upper-case letters, digits and '-' are allowed"
);

string_identifier!(
    /// Lower-case scenario identifier such as `add-positive`.
    ScenarioId,
    IdentifierKind::Scenario,
    |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-',
    "only lower-case letters, digits and '-' are allowed"
);

/// Immutable link from a test to one scenario of one feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioRef {
    feature_id: FeatureId,
    scenario_id: ScenarioId,
}

impl ScenarioRef {
    /// Pair an already validated feature and scenario.
    #[must_use]
    pub const fn new(feature_id: FeatureId, scenario_id: ScenarioId) -> Self {
        Self {
            feature_id,
            scenario_id,
        }
    }

    /// Validate both identifiers and pair them.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::InvalidIdentifier`] for the first identifier
    /// that fails its grammar.
    pub fn parse(feature_id: &str, scenario_id: &str) -> SpecleftResult<Self> {
        Ok(Self::new(
            FeatureId::parse(feature_id)?,
            ScenarioId::parse(scenario_id)?,
        ))
    }

    /// The feature half of the reference.
    #[must_use]
    pub const fn feature_id(&self) -> &FeatureId {
        &self.feature_id
    }

    /// The scenario half of the reference.
    #[must_use]
    pub const fn scenario_id(&self) -> &ScenarioId {
        &self.scenario_id
    }
}

impl fmt::Display for ScenarioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.feature_id, self.scenario_id)
    }
}

/// Fully qualified name of a test function, e.g. `calc::tests::adds`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    /// Wrap a test name. Any text is accepted.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the test name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TestId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key under which one run's result set is stored.
///
/// Either an explicit label or a generated UTC timestamp suffixed with the
/// process id, so parallel worker processes never share a generated id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Validate an explicit run label.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::InvalidIdentifier`] when the label is empty,
    /// longer than [`MAX_RUN_ID_LEN`], starts with `.`, or contains anything
    /// other than ASCII letters, digits, `.`, `_` and `-`.
    pub fn parse(value: impl Into<String>) -> SpecleftResult<Self> {
        let label = value.into();
        check_grammar(
            IdentifierKind::Run,
            &label,
            |c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'),
            "only ASCII letters, digits, '.', '_' and '-' are allowed",
        )?;
        if label.len() > MAX_RUN_ID_LEN {
            return Err(SpecleftError::invalid_identifier(
                IdentifierKind::Run,
                &label,
                "must be at most 128 bytes long",
            ));
        }
        if label.starts_with('.') {
            return Err(SpecleftError::invalid_identifier(
                IdentifierKind::Run,
                &label,
                "must not start with '.'",
            ));
        }
        Ok(Self(label))
    }

    /// Generate a run id from the current UTC time and process id.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(OffsetDateTime::now_utc())
    }

    /// Generate a run id for `instant`, e.g. `20261016T223400.125Z-4242`.
    #[must_use]
    pub fn generate_at(instant: OffsetDateTime) -> Self {
        let format =
            format_description!("[year][month][day]T[hour][minute][second].[subsecond digits:3]Z");
        let stamp = instant
            .format(&format)
            .unwrap_or_else(|_| instant.unix_timestamp().to_string());
        Self(format!("{stamp}-{}", std::process::id()))
    }

    /// Borrow the run id text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RunId {
    type Error = SpecleftError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl FromStr for RunId {
    type Err = SpecleftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<RunId> for String {
    fn from(value: RunId) -> Self {
        value.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
