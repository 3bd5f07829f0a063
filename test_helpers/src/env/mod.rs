//! Helpers for safely mutating environment variables in tests.
//!
//! Each mutation takes a global re-entrant mutex and returns an RAII guard
//! that restores the previous state when dropped. Stacked guards for one key
//! restore in LIFO order. Use [`lock`] or [`scrub_prefix`] when a test needs
//! the environment to stay still across several operations.
//!
//! # Examples
//!
//! ```
//! use specleft_test_helpers::env;
//!
//! let _g = env::set_var("SPECLEFT_FLUSH", "manual");
//! assert_eq!(std::env::var("SPECLEFT_FLUSH").as_deref(), Ok("manual"));
//! ```

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::LazyLock;

static ENV_MUTEX: LazyLock<ReentrantMutex<()>> = LazyLock::new(ReentrantMutex::default);

/// Wrapper around `std::env::set_var`.
///
/// # Safety
///
/// Callers must hold `ENV_MUTEX`.
unsafe fn env_set_var(key: &str, value: &OsStr) {
    unsafe { env::set_var(key, value) };
}

/// Wrapper around `std::env::remove_var`.
///
/// # Safety
///
/// Callers must hold `ENV_MUTEX`.
unsafe fn env_remove_var(key: &str) {
    unsafe { env::remove_var(key) };
}

fn mutate_locked<F>(
    key: String,
    mutator: F,
    _guard: &ReentrantMutexGuard<'static, ()>,
) -> EnvVarGuard
where
    F: FnOnce(&str),
{
    let original = env::var_os(&key);
    mutator(&key);
    EnvVarGuard { key, original }
}

/// RAII guard restoring an environment variable to its prior value on drop.
#[must_use = "dropping restores the prior value"]
pub struct EnvVarGuard {
    key: String,
    original: Option<OsString>,
}

impl fmt::Debug for EnvVarGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVarGuard")
            .field("key", &self.key)
            .field("had_original", &self.original.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let _guard = ENV_MUTEX.lock();
        if let Some(val) = self.original.take() {
            // SAFETY: We hold `ENV_MUTEX` during restoration.
            unsafe { env_set_var(&self.key, &val) };
        } else {
            // SAFETY: We hold `ENV_MUTEX` during restoration.
            unsafe { env_remove_var(&self.key) };
        }
    }
}

/// Holds the global environment lock for its lifetime.
#[must_use = "dropping releases the environment lock"]
pub struct EnvVarLock {
    guard: ReentrantMutexGuard<'static, ()>,
}

impl EnvVarLock {
    /// Set a variable while holding the lock.
    pub fn set_var<K, V>(&self, key: K, value: V) -> EnvVarGuard
    where
        K: Into<String>,
        V: AsRef<OsStr>,
    {
        // SAFETY: `self.guard` holds `ENV_MUTEX`.
        mutate_locked(key.into(), |k| unsafe { env_set_var(k, value.as_ref()) }, &self.guard)
    }

    /// Remove a variable while holding the lock.
    pub fn remove_var<K>(&self, key: K) -> EnvVarGuard
    where
        K: Into<String>,
    {
        // SAFETY: `self.guard` holds `ENV_MUTEX`.
        mutate_locked(key.into(), |k| unsafe { env_remove_var(k) }, &self.guard)
    }
}

/// Lock plus the guards created under it. Guards restore before the lock is
/// released.
#[must_use = "dropping releases the environment lock and restores guards"]
pub struct EnvScope {
    _lock: EnvVarLock,
    guards: Vec<EnvVarGuard>,
}

impl EnvScope {
    /// Number of variables this scope changed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// `true` when the scope changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        drop(std::mem::take(&mut self.guards));
    }
}

/// Set an environment variable and return a guard restoring its prior value.
///
/// # Examples
/// ```
/// use specleft_test_helpers::env;
/// let _g = env::set_var("FOO", "bar");
/// assert!(matches!(std::env::var("FOO"), Ok(ref value) if value == "bar"));
/// ```
pub fn set_var<K, V>(key: K, value: V) -> EnvVarGuard
where
    K: Into<String>,
    V: AsRef<OsStr>,
{
    lock().set_var(key, value)
}

/// Remove an environment variable and return a guard restoring its prior
/// value.
pub fn remove_var<K>(key: K) -> EnvVarGuard
where
    K: Into<String>,
{
    lock().remove_var(key)
}

/// Acquire the global environment lock.
pub fn lock() -> EnvVarLock {
    EnvVarLock {
        guard: ENV_MUTEX.lock(),
    }
}

/// Remove every variable whose name starts with `prefix`, holding the lock
/// until the returned scope drops.
///
/// # Examples
/// ```
/// use specleft_test_helpers::env;
///
/// let _outer = env::set_var("SPECLEFT_RUN_LABEL", "local");
/// {
///     let _scope = env::scrub_prefix("SPECLEFT_");
///     assert!(std::env::var("SPECLEFT_RUN_LABEL").is_err());
/// }
/// assert_eq!(std::env::var("SPECLEFT_RUN_LABEL").as_deref(), Ok("local"));
/// ```
pub fn scrub_prefix(prefix: &str) -> EnvScope {
    let lock = lock();
    let keys: Vec<String> = env::vars_os()
        .filter_map(|(key, _)| key.into_string().ok())
        .filter(|key| key.starts_with(prefix))
        .collect();
    let guards = keys.into_iter().map(|key| lock.remove_var(key)).collect();
    EnvScope {
        _lock: lock,
        guards,
    }
}

/// Run `f` while holding the global environment lock.
pub fn with_lock<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock();
    f()
}
