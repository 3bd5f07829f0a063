//! Specification metadata and the resolver seam used to look it up.
//!
//! Parsing spec documents happens elsewhere. This module only describes what
//! a resolved scenario carries and provides [`SpecIndex`], an in-memory
//! resolver hosts can populate programmatically.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::ScenarioRef;
use crate::model::UNKNOWN_STORY;

/// Scenario priority from the spec document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Must never regress.
    Critical,
    /// Important behaviour.
    High,
    /// Default priority.
    Medium,
    /// Nice to have.
    Low,
}

/// Rough execution-time hint for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionTime {
    /// Runs in milliseconds.
    Fast,
    /// Runs in seconds.
    Medium,
    /// Runs long enough to be worth filtering out.
    Slow,
}

/// Metadata copied from a resolved scenario onto its test results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecMetadata {
    /// Story the scenario belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_id: Option<String>,
    /// Human-readable scenario title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
    /// Free-form tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Scenario priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Execution-time hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<ExecutionTime>,
}

impl SpecMetadata {
    /// The story id, or `"unknown"` when none was given.
    #[must_use]
    pub fn story_or_unknown(&self) -> &str {
        self.story_id.as_deref().unwrap_or(UNKNOWN_STORY)
    }

    /// Tags as sanitised marker names, in tag order.
    #[must_use]
    pub fn markers(&self) -> Vec<String> {
        self.tags.iter().map(|tag| sanitize_marker_name(tag)).collect()
    }
}

/// Turn a tag into a marker name: `-` and spaces become `_`.
///
/// ```
/// assert_eq!(specleft::sanitize_marker_name("auth-flow test"), "auth_flow_test");
/// ```
#[must_use]
pub fn sanitize_marker_name(tag: &str) -> String {
    tag.trim().replace(['-', ' '], "_")
}

/// Looks up spec metadata for a scenario.
pub trait SpecResolver: Send + Sync {
    /// Metadata for `scenario`, or `None` when the scenario is unknown.
    fn resolve_scenario(&self, scenario: &ScenarioRef) -> Option<SpecMetadata>;
}

/// In-memory [`SpecResolver`] keyed by scenario.
#[derive(Debug, Clone, Default)]
pub struct SpecIndex {
    scenarios: HashMap<ScenarioRef, SpecMetadata>,
}

impl SpecIndex {
    /// Empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the metadata of `scenario`.
    pub fn insert(&mut self, scenario: ScenarioRef, metadata: SpecMetadata) -> &mut Self {
        self.scenarios.insert(scenario, metadata);
        self
    }

    /// Number of known scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// `true` when no scenario is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl FromIterator<(ScenarioRef, SpecMetadata)> for SpecIndex {
    fn from_iter<I: IntoIterator<Item = (ScenarioRef, SpecMetadata)>>(iter: I) -> Self {
        Self {
            scenarios: iter.into_iter().collect(),
        }
    }
}

impl SpecResolver for SpecIndex {
    fn resolve_scenario(&self, scenario: &ScenarioRef) -> Option<SpecMetadata> {
        self.scenarios.get(scenario).cloned()
    }
}

/// Tag-based selection of bound tests.
///
/// Tags are compared by their marker names, so `auth-flow` matches an
/// `auth_flow` filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl TagFilter {
    /// Build a filter; an empty `include` list admits every tag set.
    #[must_use]
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        let normalise = |tags: &[String]| -> Vec<String> {
            tags.iter().map(|t| sanitize_marker_name(t)).collect()
        };
        Self {
            include: normalise(include),
            exclude: normalise(exclude),
        }
    }

    /// `true` when the filter admits everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Decide whether a test with `metadata` should run.
    ///
    /// # Errors
    ///
    /// Returns the skip reason when the test is filtered out.
    pub fn admits(&self, metadata: &SpecMetadata) -> Result<(), FilterRejection> {
        let markers = metadata.markers();
        if let Some(tag) = self.exclude.iter().find(|tag| markers.contains(tag)) {
            return Err(FilterRejection::Excluded(tag.clone()));
        }
        if self.include.is_empty() || self.include.iter().any(|tag| markers.contains(tag)) {
            Ok(())
        } else {
            Err(FilterRejection::NotIncluded(self.include.join(", ")))
        }
    }
}

/// Why a [`TagFilter`] rejected a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRejection {
    /// The test carries an excluded tag.
    Excluded(String),
    /// The test carries none of the included tags.
    NotIncluded(String),
}

impl fmt::Display for FilterRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excluded(tag) => write!(f, "excluded by tag '{tag}'"),
            Self::NotIncluded(tags) => write!(f, "no tag matches include filter [{tags}]"),
        }
    }
}
