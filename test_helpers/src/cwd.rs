//! Guard for the process working directory.
//!
//! Configuration discovery reads `specleft.toml` from the working directory,
//! which is process-global. [`set_dir`] serialises changes behind a mutex
//! and restores the original directory on drop.
//!
//! # Examples
//!
//! ```no_run
//! use specleft_test_helpers::cwd;
//!
//! let guard = cwd::set_dir("/tmp/spec-run").expect("set cwd");
//! // The original directory comes back when `guard` drops.
//! ```

use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use parking_lot::{Mutex, MutexGuard};
use std::sync::LazyLock;

static CWD_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(Mutex::default);

/// Restores the working directory on drop.
#[must_use = "dropping restores the prior working directory"]
pub struct CwdGuard {
    original: Utf8PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl CwdGuard {
    /// Directory that will be restored.
    #[must_use]
    pub fn original(&self) -> &camino::Utf8Path {
        &self.original
    }

    /// Restore now, reporting failure.
    ///
    /// # Errors
    ///
    /// Returns an error if `set_current_dir` fails.
    pub fn restore(&self) -> std::io::Result<()> {
        std::env::set_current_dir(&self.original)
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _unused = std::env::set_current_dir(&self.original);
    }
}

/// Change into `path`, holding the global lock until the guard drops.
///
/// # Errors
///
/// Returns an error if the current directory cannot be read, is not valid
/// UTF-8, or `path` cannot be entered.
pub fn set_dir(path: impl AsRef<std::path::Path>) -> Result<CwdGuard> {
    let lock = CWD_MUTEX.lock();
    let old = std::env::current_dir().context("read current dir")?;
    let original = Utf8PathBuf::from_path_buf(old)
        .map_err(|non_utf8| anyhow!("cwd is not valid UTF-8: {}", non_utf8.display()))?;
    std::env::set_current_dir(path.as_ref()).context("set current dir")?;
    Ok(CwdGuard {
        original,
        _lock: lock,
    })
}
