//! Layered tracing configuration.
//!
//! Values are merged from serialised defaults, then `specleft.toml` (looked
//! up from the working directory upwards), then `SPECLEFT_*` environment
//! variables. Nested keys use `__` in variable names, for example
//! `SPECLEFT_CLASSIFIER__UNMATCHED_PANIC=error`.

mod env;

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

pub use env::ListEnv;

use crate::SpecleftResult;
use crate::classify::{
    DEFAULT_ASSERTION_PREFIXES, DEFAULT_ERROR_PREFIXES, PrefixClassifier, owned_prefixes,
};
use crate::ids::RunId;
use crate::model::FailureKind;
use crate::spec::TagFilter;
use crate::store::FsResultStore;

/// Prefix of environment variables read by [`TraceConfig::load`].
pub const ENV_PREFIX: &str = "SPECLEFT_";

/// Configuration file read by [`TraceConfig::load`].
pub const FILE_NAME: &str = "specleft.toml";

/// Default directory for persisted result sets.
pub const DEFAULT_RESULTS_DIR: &str = ".specleft/results";

const LIST_KEYS: &[&str] = &[
    "include_tags",
    "exclude_tags",
    "classifier.assertion_prefixes",
    "classifier.error_prefixes",
];

/// When finished tests are written to the result store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlushPolicy {
    /// Publish the run snapshot after every test.
    #[default]
    PerTest,
    /// Publish only when [`crate::Session::publish`] is called.
    Manual,
}

/// Status given to panics and returned errors matching no prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPanic {
    /// Record as `failed`.
    #[default]
    Failed,
    /// Record as `error`.
    Error,
}

impl From<UnmatchedPanic> for FailureKind {
    fn from(value: UnmatchedPanic) -> Self {
        match value {
            UnmatchedPanic::Failed => Self::Assertion,
            UnmatchedPanic::Error => Self::Error,
        }
    }
}

/// Settings of the default failure classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Message prefixes treated as assertion failures.
    pub assertion_prefixes: Vec<String>,
    /// Message prefixes treated as errors.
    pub error_prefixes: Vec<String>,
    /// Status of failures matching no prefix.
    pub unmatched_panic: UnmatchedPanic,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            assertion_prefixes: owned_prefixes(DEFAULT_ASSERTION_PREFIXES),
            error_prefixes: owned_prefixes(DEFAULT_ERROR_PREFIXES),
            unmatched_panic: UnmatchedPanic::Failed,
        }
    }
}

/// Settings of a tracing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Directory holding `results_<run_id>.json` files.
    pub results_dir: Utf8PathBuf,
    /// Explicit run id; a timestamped id is generated when absent.
    pub run_label: Option<String>,
    /// When results are written.
    pub flush: FlushPolicy,
    /// Run only bound tests carrying one of these tags.
    pub include_tags: Vec<String>,
    /// Skip bound tests carrying any of these tags.
    pub exclude_tags: Vec<String>,
    /// Skip tests bound to scenarios missing from the spec index.
    pub skip_unresolved: bool,
    /// Failure classification settings.
    pub classifier: ClassifierConfig,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            results_dir: Utf8PathBuf::from(DEFAULT_RESULTS_DIR),
            run_label: None,
            flush: FlushPolicy::default(),
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            skip_unresolved: false,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl TraceConfig {
    /// Provider stack used by [`TraceConfig::load`].
    #[must_use]
    pub fn figment() -> Figment {
        Self::layered(Toml::file(FILE_NAME))
    }

    fn layered(file: figment::providers::Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(file)
            .merge(ListEnv::prefixed(ENV_PREFIX).list_keys(LIST_KEYS))
    }

    /// Load from defaults, `specleft.toml` and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SpecleftError::Config`] when a source cannot be read
    /// or a value has the wrong type.
    pub fn load() -> SpecleftResult<Self> {
        Ok(Self::figment().extract()?)
    }

    /// Load using `path` instead of the discovered `specleft.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SpecleftError::Config`] when a source cannot be read
    /// or a value has the wrong type.
    pub fn load_from(path: &Utf8Path) -> SpecleftResult<Self> {
        Ok(Self::layered(Toml::file_exact(path.as_std_path())).extract()?)
    }

    /// The configured run label, or a freshly generated run id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SpecleftError::InvalidIdentifier`] when the label is
    /// not a valid run id.
    pub fn run_id(&self) -> SpecleftResult<RunId> {
        self.run_label
            .as_deref()
            .map_or_else(|| Ok(RunId::generate()), RunId::parse)
    }

    /// Failure classifier described by [`TraceConfig::classifier`].
    #[must_use]
    pub fn failure_classifier(&self) -> PrefixClassifier {
        PrefixClassifier::new(
            self.classifier.assertion_prefixes.clone(),
            self.classifier.error_prefixes.clone(),
            self.classifier.unmatched_panic.into(),
        )
    }

    /// Tag filter described by the include and exclude lists.
    #[must_use]
    pub fn tag_filter(&self) -> TagFilter {
        TagFilter::new(&self.include_tags, &self.exclude_tags)
    }

    /// File store rooted at [`TraceConfig::results_dir`].
    #[must_use]
    pub fn store(&self) -> FsResultStore {
        FsResultStore::new(self.results_dir.clone())
    }
}
