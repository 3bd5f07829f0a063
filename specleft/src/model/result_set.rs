//! Grouping of one run's results by feature, story and scenario.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::TestResult;
use crate::ids::{FeatureId, RunId, ScenarioId, ScenarioRef};

/// Story id used when the spec metadata names none.
pub const UNKNOWN_STORY: &str = "unknown";

/// Results of one scenario, in completion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResults {
    /// Scenario the results belong to.
    pub scenario_id: ScenarioId,
    /// Test results in the order the tests finished.
    pub results: Vec<TestResult>,
}

/// Scenarios of one story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryResults {
    /// Story id from spec metadata, or [`UNKNOWN_STORY`].
    pub story_id: String,
    /// Scenarios sorted by id.
    pub scenarios: Vec<ScenarioResults>,
}

/// Stories of one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureResults {
    /// Feature the stories belong to.
    pub feature_id: FeatureId,
    /// Stories sorted by id.
    pub stories: Vec<StoryResults>,
}

/// All results of one run, grouped feature → story → scenario.
///
/// Unbound tests land in [`ResultSet::unclassified`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    run_id: RunId,
    #[serde(with = "time::serde::rfc3339")]
    generated_at: OffsetDateTime,
    features: Vec<FeatureResults>,
    unclassified: Vec<TestResult>,
}

type Grouping = BTreeMap<FeatureId, BTreeMap<String, BTreeMap<ScenarioId, Vec<TestResult>>>>;

impl ResultSet {
    /// Group `results`, given in completion order, under `run_id`.
    pub fn from_results(run_id: RunId, results: impl IntoIterator<Item = TestResult>) -> Self {
        let mut grouping = Grouping::new();
        let mut unclassified = Vec::new();
        for result in results {
            let Some(scenario) = result.scenario_ref().cloned() else {
                unclassified.push(result);
                continue;
            };
            let story = result.metadata().story_or_unknown().to_owned();
            grouping
                .entry(scenario.feature_id().clone())
                .or_default()
                .entry(story)
                .or_default()
                .entry(scenario.scenario_id().clone())
                .or_default()
                .push(result);
        }
        let features = grouping
            .into_iter()
            .map(|(feature_id, stories)| FeatureResults {
                feature_id,
                stories: stories
                    .into_iter()
                    .map(|(story_id, scenarios)| StoryResults {
                        story_id,
                        scenarios: scenarios
                            .into_iter()
                            .map(|(scenario_id, results)| ScenarioResults {
                                scenario_id,
                                results,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            run_id,
            generated_at: OffsetDateTime::now_utc(),
            features,
            unclassified,
        }
    }

    /// Run this set belongs to.
    #[must_use]
    pub const fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// When the set was grouped.
    #[must_use]
    pub const fn generated_at(&self) -> OffsetDateTime {
        self.generated_at
    }

    /// Features sorted by id.
    #[must_use]
    pub fn features(&self) -> &[FeatureResults] {
        &self.features
    }

    /// Results of tests without a scenario binding, in completion order.
    #[must_use]
    pub fn unclassified(&self) -> &[TestResult] {
        &self.unclassified
    }

    /// Results recorded for one scenario, searching every story.
    #[must_use]
    pub fn scenario(&self, scenario: &ScenarioRef) -> Option<&ScenarioResults> {
        self.features
            .iter()
            .filter(|feature| &feature.feature_id == scenario.feature_id())
            .flat_map(|feature| &feature.stories)
            .flat_map(|story| &story.scenarios)
            .find(|group| &group.scenario_id == scenario.scenario_id())
    }

    /// Every test result, grouped ones first, then unclassified ones.
    pub fn results(&self) -> impl Iterator<Item = &TestResult> {
        self.features
            .iter()
            .flat_map(|feature| &feature.stories)
            .flat_map(|story| &story.scenarios)
            .flat_map(|group| &group.results)
            .chain(&self.unclassified)
    }

    /// Number of test results in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results().count()
    }

    /// `true` when no test result was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results().next().is_none()
    }
}
