use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Failure, Status};

/// A sealed step: one named sub-phase of a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Free-text step name.
    pub name: String,
    /// Final status of the step, including failures raised by children.
    pub status: Status,
    /// Nesting level when the step opened; top-level steps have depth 0.
    pub depth: usize,
    /// When the step opened.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    /// When the step sealed.
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    /// Failure observed inside this step, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    /// Arbitrary key/value pairs attached while the step was open.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attachments: BTreeMap<String, String>,
}
