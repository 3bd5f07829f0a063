//! Process-wide wiring of registry, resolver, aggregator and store.

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::SpecleftError;
use crate::SpecleftResult;
use crate::aggregate::Aggregator;
use crate::binding::{Binding, Registry, ScenarioDecl};
use crate::classify::{FailureClassifier, PrefixClassifier};
use crate::config::{FlushPolicy, TraceConfig};
use crate::context::{StepContext, panic};
use crate::hooks::{Outcome, TestGuard};
use crate::ids::{RunId, ScenarioRef, TestId};
use crate::model::{PendingTest, Resolution, ResultSet, TestResult};
use crate::spec::{SpecMetadata, SpecResolver, TagFilter};
use crate::store::ResultStore;

static GLOBAL: OnceLock<Session> = OnceLock::new();

/// One test run: where bindings, results and published records meet.
///
/// Most hosts use [`Session::global`], which the `#[scenario]` and
/// `#[traced]` attributes call into. Sessions built with
/// [`Session::builder`] are independent and suit tests of the tracing
/// machinery itself.
pub struct Session {
    run_id: RunId,
    registry: Registry,
    resolver: RwLock<Option<Arc<dyn SpecResolver>>>,
    classifier: Arc<dyn FailureClassifier>,
    aggregator: Aggregator,
    store: Option<Arc<dyn ResultStore>>,
    flush: FlushPolicy,
    tag_filter: TagFilter,
    skip_unresolved: bool,
    publish_lock: Mutex<()>,
    flush_error: Mutex<Option<Arc<SpecleftError>>>,
}

/// Builder for [`Session`].
#[must_use]
pub struct SessionBuilder {
    run_id: Option<RunId>,
    resolver: Option<Arc<dyn SpecResolver>>,
    classifier: Arc<dyn FailureClassifier>,
    store: Option<Arc<dyn ResultStore>>,
    flush: FlushPolicy,
    tag_filter: TagFilter,
    skip_unresolved: bool,
}

impl SessionBuilder {
    /// Use an explicit run id instead of a generated one.
    pub fn run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Resolve bound scenarios through `resolver`.
    pub fn resolver(mut self, resolver: Arc<dyn SpecResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Classify failures with `classifier`.
    pub fn classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Publish result sets to `store`.
    pub fn store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// When results are published.
    pub const fn flush(mut self, flush: FlushPolicy) -> Self {
        self.flush = flush;
        self
    }

    /// Skip bound tests rejected by `filter`.
    pub fn tag_filter(mut self, filter: TagFilter) -> Self {
        self.tag_filter = filter;
        self
    }

    /// Skip tests bound to scenarios the resolver does not know.
    ///
    /// Off by default: such tests run and are recorded as `unresolved`.
    pub const fn skip_unresolved(mut self, skip: bool) -> Self {
        self.skip_unresolved = skip;
        self
    }

    /// Finish building. The panic hook is installed here.
    #[must_use]
    pub fn build(self) -> Session {
        panic::install();
        Session {
            run_id: self.run_id.unwrap_or_else(RunId::generate),
            registry: Registry::new(),
            resolver: RwLock::new(self.resolver),
            classifier: self.classifier,
            aggregator: Aggregator::new(),
            store: self.store,
            flush: self.flush,
            tag_filter: self.tag_filter,
            skip_unresolved: self.skip_unresolved,
            publish_lock: Mutex::new(()),
            flush_error: Mutex::new(None),
        }
    }
}

impl Session {
    /// Builder with no store, no resolver and the default classifier.
    pub fn builder() -> SessionBuilder {
        SessionBuilder {
            run_id: None,
            resolver: None,
            classifier: Arc::new(PrefixClassifier::default()),
            store: None,
            flush: FlushPolicy::PerTest,
            tag_filter: TagFilter::default(),
            skip_unresolved: false,
        }
    }

    /// Session described by `config`, publishing to its file store.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SpecleftError::InvalidIdentifier`] when the
    /// configured run label is not a valid run id.
    pub fn from_config(config: &TraceConfig) -> SpecleftResult<Self> {
        Ok(Self::builder()
            .run_id(config.run_id()?)
            .classifier(Arc::new(config.failure_classifier()))
            .store(Arc::new(config.store()))
            .flush(config.flush)
            .tag_filter(config.tag_filter())
            .skip_unresolved(config.skip_unresolved)
            .build())
    }

    /// The process-wide session, built from [`TraceConfig::load`] on first
    /// use.
    ///
    /// Configuration errors are logged and the defaults used instead, so a
    /// broken `specleft.toml` never stops a test run.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| {
            TraceConfig::load()
                .and_then(|config| Self::from_config(&config))
                .unwrap_or_else(|error| {
                    tracing::warn!(%error, "falling back to default tracing configuration");
                    let defaults = TraceConfig::default();
                    Self::builder()
                        .store(Arc::new(defaults.store()))
                        .build()
                })
        })
    }

    /// Install `session` as the process-wide session.
    ///
    /// # Errors
    ///
    /// Returns `session` unchanged when a global session already exists.
    pub fn install_global(session: Self) -> Result<&'static Self, Self> {
        GLOBAL.set(session)?;
        Ok(Self::global())
    }

    /// Run id results are published under.
    #[must_use]
    pub const fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Registry of scenario bindings.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Aggregator holding this run's results.
    #[must_use]
    pub const fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Store results are published to, if any.
    #[must_use]
    pub fn store(&self) -> Option<&Arc<dyn ResultStore>> {
        self.store.as_ref()
    }

    /// Flush policy.
    #[must_use]
    pub const fn flush_policy(&self) -> FlushPolicy {
        self.flush
    }

    /// Replace the resolver used for tests entered from now on.
    pub fn set_resolver(&self, resolver: Arc<dyn SpecResolver>) {
        *self.resolver.write() = Some(resolver);
    }

    pub(crate) fn classifier(&self) -> &dyn FailureClassifier {
        self.classifier.as_ref()
    }

    fn resolve(&self, scenario: &ScenarioRef) -> (Resolution, SpecMetadata) {
        let configured = self.resolver.read().clone();
        let Some(resolver) = configured else {
            return (Resolution::Unchecked, SpecMetadata::default());
        };
        resolver.resolve_scenario(scenario).map_or_else(
            || {
                tracing::warn!(%scenario, "bound scenario is not in the spec index");
                (Resolution::Unresolved, SpecMetadata::default())
            },
            |metadata| (Resolution::Resolved, metadata),
        )
    }

    /// Start a test, using any binding registered for `test_id`.
    pub fn enter(&self, test: impl Into<TestId>) -> TestGuard<'_> {
        let test_id = test.into();
        let binding = self.registry.lookup(&test_id);
        self.start(test_id, binding.as_deref())
    }

    /// Start a test declared by the `#[scenario]` attribute.
    ///
    /// A declaration that cannot be registered yields a guard that records
    /// an `error` result; see [`TestGuard::check_binding`].
    pub fn enter_declared(&self, test: impl Into<TestId>, decl: &ScenarioDecl) -> TestGuard<'_> {
        let test_id = test.into();
        match self.registry.declare(&test_id, decl) {
            Ok(binding) => self.start(test_id, Some(binding.as_ref())),
            Err(error) => {
                tracing::error!(test = %test_id, %error, "scenario declaration rejected");
                let scenario = ScenarioRef::parse(decl.feature_id, decl.scenario_id).ok();
                TestGuard::broken(self, StepContext::current(), test_id, scenario, error)
            }
        }
    }

    /// Why a bound test must not run, after its own skip directive.
    fn skip_reason(
        &self,
        scenario: &ScenarioRef,
        resolution: Resolution,
        metadata: &SpecMetadata,
    ) -> Option<String> {
        match resolution {
            Resolution::Resolved => self
                .tag_filter
                .admits(metadata)
                .err()
                .map(|rejection| rejection.to_string()),
            Resolution::Unresolved if self.skip_unresolved => Some(format!(
                "scenario {} of feature {} not found in specs",
                scenario.scenario_id(),
                scenario.feature_id(),
            )),
            _ => None,
        }
    }

    fn start(&self, test_id: TestId, declared: Option<&Binding>) -> TestGuard<'_> {
        let context = StepContext::current();
        let mut pending =
            PendingTest::new(test_id.clone()).with_classifier(Arc::clone(&self.classifier));
        if let Some(binding) = declared {
            let scenario = binding.scenario().clone();
            let (resolution, metadata) = self.resolve(&scenario);
            let rejection = self.skip_reason(&scenario, resolution, &metadata);
            pending = pending.with_scenario(scenario, resolution, metadata);
            if let Some(reason) = binding.skip_reason() {
                pending = pending.skipped(reason);
            } else if let Some(reason) = rejection {
                pending = pending.skipped(reason);
            }
        }
        if pending.is_skipped() {
            tracing::debug!(test = %test_id, "test skipped");
            return TestGuard::skipped(self, context, pending);
        }
        let scenario = pending.scenario_ref().cloned();
        match context.bind(pending) {
            Ok(()) => TestGuard::bound(self, context, test_id, scenario),
            Err(error) => {
                tracing::warn!(test = %test_id, %error, "could not bind test to step context");
                TestGuard::broken(self, context, test_id, scenario, error)
            }
        }
    }

    /// Run `body` as a traced test and return its value.
    ///
    /// Returns `None` without running `body` when the test is skipped. A
    /// panic in `body` is recorded and then resumed.
    pub fn run<R: Outcome>(
        &self,
        test: impl Into<TestId>,
        body: impl FnOnce() -> R,
    ) -> Option<R> {
        let guard = self.enter(test);
        if guard.is_skipped() {
            guard.finish(None);
            return None;
        }
        match catch_unwind(AssertUnwindSafe(body)) {
            Ok(outcome) => {
                guard.observe(&outcome);
                Some(outcome)
            }
            Err(payload) => {
                let failure = guard.context().panic_failure();
                guard.finish(failure);
                resume_unwind(payload)
            }
        }
    }

    pub(crate) fn record(&self, result: TestResult) {
        self.aggregator.add(result);
        if self.flush == FlushPolicy::PerTest && self.store.is_some() {
            if let Err(error) = self.save() {
                tracing::warn!(run = %self.run_id, %error, "failed to flush results");
                let mut first = self.flush_error.lock();
                if first.is_none() {
                    *first = Some(Arc::new(error));
                }
            }
        }
    }

    /// First per-test flush failure not yet reported by [`Session::publish`].
    #[must_use]
    pub fn flush_error(&self) -> Option<Arc<SpecleftError>> {
        self.flush_error.lock().clone()
    }

    /// Group everything recorded so far.
    #[must_use]
    pub fn finalize(&self) -> Arc<ResultSet> {
        self.aggregator.finalize(&self.run_id)
    }

    /// Finalise and save to the store, when one is configured.
    ///
    /// Concurrent publishes are serialised, so the record left in the store
    /// is always the most recent snapshot.
    ///
    /// # Errors
    ///
    /// Returns the store's error when saving fails. Otherwise returns
    /// [`SpecleftError::FlushFailed`] once when an earlier per-test flush
    /// failed, even though this save succeeded.
    pub fn publish(&self) -> SpecleftResult<Arc<ResultSet>> {
        let published = self.save()?;
        match self.flush_error.lock().take() {
            Some(source) => Err(SpecleftError::FlushFailed { source }),
            None => Ok(published),
        }
    }

    fn save(&self) -> SpecleftResult<Arc<ResultSet>> {
        let _serialised = self.publish_lock.lock();
        match &self.store {
            Some(store) => self.aggregator.publish(&self.run_id, store.as_ref()),
            None => Ok(self.finalize()),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("run_id", &self.run_id)
            .field("bindings", &self.registry.len())
            .field("results", &self.aggregator.len())
            .field("flush", &self.flush)
            .finish_non_exhaustive()
    }
}
