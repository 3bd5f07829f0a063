//! Per-thread capture of the most recent panic.
//!
//! `Drop` cannot see a panic payload, so a chained process panic hook stores
//! what it saw in a thread-local slot for step and test guards to classify
//! while the thread unwinds. The previously installed hook always runs
//! afterwards, so the test harness still reports the panic.
//!
//! A hook set with [`std::panic::set_hook`] after the first session is
//! built replaces the capturing hook; [`reinstall_panic_hook`] chains it
//! back in front.

use std::cell::RefCell;
use std::panic::{self, PanicHookInfo};
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::classify::PanicCapture;

type Hook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicCapture>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Address of the capturing hook currently handed to `std`, or zero.
static INSTALLED: AtomicUsize = AtomicUsize::new(0);

/// Install the capturing hook once per process, chaining the current hook.
pub(crate) fn install() {
    INSTALL.call_once(reinstall_panic_hook);
}

/// Put the capturing panic hook back in front of the current hook.
///
/// Call this after installing a hook of your own with
/// [`std::panic::set_hook`]; without it, panics are no longer classified
/// and every panicking step is recorded with a generic message. Calling it
/// while the capturing hook is already active changes nothing.
///
/// # Panics
///
/// Panics when called from a thread that is already panicking, as
/// [`std::panic::take_hook`] does.
pub fn reinstall_panic_hook() {
    let previous = panic::take_hook();
    if hook_address(&previous) == INSTALLED.load(Ordering::Acquire) {
        panic::set_hook(previous);
        return;
    }
    let hook: Hook = Box::new(move |info| {
        let location = info.location().map(ToString::to_string);
        store(PanicCapture::from_payload(info.payload(), location));
        previous(info);
    });
    INSTALLED.store(hook_address(&hook), Ordering::Release);
    panic::set_hook(hook);
}

fn hook_address(hook: &Hook) -> usize {
    std::ptr::from_ref(hook.as_ref()).cast::<()>().addr()
}

fn store(capture: PanicCapture) {
    let _unused = LAST_PANIC.try_with(|slot| {
        if let Ok(mut last) = slot.try_borrow_mut() {
            *last = Some(capture);
        }
    });
}

/// The last panic seen on this thread, if any.
pub(crate) fn current() -> Option<PanicCapture> {
    LAST_PANIC
        .try_with(|slot| slot.try_borrow().ok().and_then(|c| c.clone()))
        .ok()
        .flatten()
}

/// Forget the last panic seen on this thread.
pub(crate) fn clear() {
    let _unused = LAST_PANIC.try_with(|slot| {
        if let Ok(mut last) = slot.try_borrow_mut() {
            *last = None;
        }
    });
}

#[cfg(test)]
mod tests {
    #![allow(
        unfulfilled_lint_expectations,
        reason = "clippy::expect_used is denied globally; tests may not hit those branches"
    )]
    #![expect(clippy::expect_used, reason = "tests panic to surface panic capture mistakes")]

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn captures_panics_on_the_panicking_thread_only() {
        install();
        clear();
        let outcome = std::thread::spawn(|| {
            let caught = std::panic::catch_unwind(|| panic!("inner boom"));
            assert!(caught.is_err());
            current().map(|c| c.message().to_owned())
        })
        .join()
        .expect("thread joins");
        assert_eq!(outcome.as_deref(), Some("inner boom"));
        assert!(current().is_none());
    }
}
