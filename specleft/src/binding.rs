//! Typed registration of tests against scenarios.
//!
//! A [`Registry`] maps test names to immutable [`Binding`]s. Bindings are
//! validated when registered and never change afterwards; binding the same
//! test twice is an error that leaves the first binding in place.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::ids::{ScenarioRef, TestId};
use crate::{SpecleftError, SpecleftResult};

/// Scenario binding of one test, plus its skip directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    scenario: ScenarioRef,
    skip: bool,
    reason: Option<String>,
}

impl Binding {
    /// Bind to `scenario` without skipping.
    #[must_use]
    pub const fn new(scenario: ScenarioRef) -> Self {
        Self {
            scenario,
            skip: false,
            reason: None,
        }
    }

    /// Record the test as skipped instead of running it.
    #[must_use]
    pub fn skipped(mut self, reason: Option<String>) -> Self {
        self.skip = true;
        self.reason = reason;
        self
    }

    /// The bound scenario.
    #[must_use]
    pub const fn scenario(&self) -> &ScenarioRef {
        &self.scenario
    }

    /// Whether the test body must not run.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.skip
    }

    /// Skip reason, or a default one when the directive gave none.
    #[must_use]
    pub fn skip_reason(&self) -> Option<&str> {
        self.skip
            .then(|| self.reason.as_deref().unwrap_or("skipped by scenario binding"))
    }
}

/// Static binding emitted by the `#[scenario]` attribute.
///
/// The identifiers were validated at compile time but are validated again
/// on registration, so hand-written declarations are held to the same
/// grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioDecl {
    /// Upper-case feature identifier.
    pub feature_id: &'static str,
    /// Lower-case scenario identifier.
    pub scenario_id: &'static str,
    /// Record the test as skipped instead of running it.
    pub skip: bool,
    /// Why the test is skipped.
    pub reason: Option<&'static str>,
}

impl ScenarioDecl {
    /// Validate the declaration and turn it into a [`Binding`].
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::InvalidIdentifier`] when either identifier
    /// fails its grammar.
    pub fn to_binding(&self) -> SpecleftResult<Binding> {
        let binding = Binding::new(ScenarioRef::parse(self.feature_id, self.scenario_id)?);
        Ok(if self.skip {
            binding.skipped(self.reason.map(str::to_owned))
        } else {
            binding
        })
    }
}

/// Process-wide map from test names to bindings.
#[derive(Debug, Default)]
pub struct Registry {
    bindings: RwLock<HashMap<TestId, Arc<Binding>>>,
}

impl Registry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `feature_id` and `scenario_id` and bind `test_id` to them.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::InvalidIdentifier`] when an identifier fails
    /// its grammar and [`SpecleftError::DuplicateBinding`] when `test_id` is
    /// already bound. Nothing is registered in either case.
    pub fn bind_scenario(
        &self,
        test_id: TestId,
        feature_id: &str,
        scenario_id: &str,
    ) -> SpecleftResult<Arc<Binding>> {
        let scenario = ScenarioRef::parse(feature_id, scenario_id)?;
        self.register(test_id, Binding::new(scenario))
    }

    /// Register a pre-built binding.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::DuplicateBinding`] when `test_id` is already
    /// bound.
    pub fn register(&self, test_id: TestId, binding: Binding) -> SpecleftResult<Arc<Binding>> {
        let mut bindings = self.bindings.write();
        if let Some(existing) = bindings.get(&test_id) {
            return Err(SpecleftError::DuplicateBinding {
                test_id: test_id.to_string(),
                existing: existing.scenario().to_string(),
            });
        }
        let shared = Arc::new(binding);
        tracing::debug!(test = %test_id, scenario = %shared.scenario(), "scenario bound");
        bindings.insert(test_id, Arc::clone(&shared));
        Ok(shared)
    }

    /// Register a macro declaration when its test starts.
    ///
    /// A test that runs more than once in a process (for example under a
    /// retrying harness) declares the same binding each time; an identical
    /// declaration returns the existing binding.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::InvalidIdentifier`] for a malformed
    /// declaration and [`SpecleftError::DuplicateBinding`] when `test_id` is
    /// bound to something else.
    pub fn declare(&self, test_id: &TestId, decl: &ScenarioDecl) -> SpecleftResult<Arc<Binding>> {
        let binding = decl.to_binding()?;
        if let Some(existing) = self.lookup(test_id) {
            return if *existing == binding {
                Ok(existing)
            } else {
                Err(SpecleftError::DuplicateBinding {
                    test_id: test_id.to_string(),
                    existing: existing.scenario().to_string(),
                })
            };
        }
        match self.register(test_id.clone(), binding) {
            Err(SpecleftError::DuplicateBinding { .. }) => self.declare(test_id, decl),
            other => other,
        }
    }

    /// Binding of `test_id`, if any.
    #[must_use]
    pub fn lookup(&self, test_id: &TestId) -> Option<Arc<Binding>> {
        self.bindings.read().get(test_id).cloned()
    }

    /// Number of bound tests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    /// `true` when no test is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}
