//! Read-side counts over a [`ResultSet`].

use serde::{Deserialize, Serialize};

use crate::ids::{FeatureId, ScenarioId};
use crate::model::{ResultSet, Status, TestResult};

/// Test counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// All tests.
    pub total: usize,
    /// Tests that passed.
    pub passed: usize,
    /// Tests with an assertion failure.
    pub failed: usize,
    /// Tests with an unexpected failure.
    pub error: usize,
    /// Tests that did not run.
    pub skipped: usize,
}

impl Counts {
    fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Passed => self.passed += 1,
            Status::Failed => self.failed += 1,
            Status::Error => self.error += 1,
            Status::Skipped => self.skipped += 1,
        }
    }

    fn add(&mut self, other: Self) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.error += other.error;
        self.skipped += other.skipped;
    }

    fn of<'a>(results: impl IntoIterator<Item = &'a TestResult>) -> Self {
        let mut counts = Self::default();
        for result in results {
            counts.record(result.status());
        }
        counts
    }

    /// Tests that ran, whatever their outcome.
    #[must_use]
    pub const fn ran(&self) -> usize {
        self.total.saturating_sub(self.skipped)
    }

    /// `true` when at least one test ran and none failed or errored.
    #[must_use]
    pub const fn is_green(&self) -> bool {
        self.ran() > 0 && self.failed == 0 && self.error == 0
    }
}

/// Counts for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioSummary {
    /// Scenario counted.
    pub scenario_id: ScenarioId,
    /// Its counts.
    pub counts: Counts,
}

/// Counts for one story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorySummary {
    /// Story counted.
    pub story_id: String,
    /// Sum over its scenarios.
    pub counts: Counts,
    /// Per-scenario counts.
    pub scenarios: Vec<ScenarioSummary>,
}

/// Counts for one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSummary {
    /// Feature counted.
    pub feature_id: FeatureId,
    /// Sum over its stories.
    pub counts: Counts,
    /// Per-story counts.
    pub stories: Vec<StorySummary>,
}

/// Counts for a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Every test in the run.
    pub totals: Counts,
    /// Per-feature counts.
    pub features: Vec<FeatureSummary>,
    /// Tests without a scenario binding.
    pub unclassified: Counts,
}

/// Count `set` by status at every grouping level.
#[must_use]
pub fn summary(set: &ResultSet) -> Summary {
    let mut totals = Counts::default();
    let features = set
        .features()
        .iter()
        .map(|feature| {
            let mut feature_counts = Counts::default();
            let stories = feature
                .stories
                .iter()
                .map(|story| {
                    let mut story_counts = Counts::default();
                    let scenarios = story
                        .scenarios
                        .iter()
                        .map(|scenario| {
                            let counts = Counts::of(&scenario.results);
                            story_counts.add(counts);
                            ScenarioSummary {
                                scenario_id: scenario.scenario_id.clone(),
                                counts,
                            }
                        })
                        .collect();
                    feature_counts.add(story_counts);
                    StorySummary {
                        story_id: story.story_id.clone(),
                        counts: story_counts,
                        scenarios,
                    }
                })
                .collect();
            totals.add(feature_counts);
            FeatureSummary {
                feature_id: feature.feature_id.clone(),
                counts: feature_counts,
                stories,
            }
        })
        .collect();
    let unclassified = Counts::of(set.unclassified());
    totals.add(unclassified);
    Summary {
        totals,
        features,
        unclassified,
    }
}
