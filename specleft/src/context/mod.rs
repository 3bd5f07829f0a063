//! Per-thread step tracking for the test running on that thread.
//!
//! A [`StepContext`] holds at most one bound test and the stack of steps that
//! test has open. Each thread reaches its own context through
//! [`StepContext::current`]; callers that manage threads themselves may
//! create and pass contexts explicitly. Contexts are `!Send`, so a stack can
//! never be touched from a thread other than the one that opened it.
//!
//! Steps are opened with [`StepContext::open_step`] (or the free [`step`]
//! function) and sealed when the returned [`StepGuard`] drops, including
//! while the thread unwinds from a panic.

pub(crate) mod panic;

pub use panic::reinstall_panic_hook;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::rc::Rc;
use std::thread;

use time::OffsetDateTime;

use crate::classify::{PanicCapture, panic_failure};
use crate::ids::TestId;
use crate::model::{Failure, FailureKind, PendingTest, Status, StepRecord, TestResult};
use crate::{SpecleftError, SpecleftResult};

/// Attachment key added to steps sealed because their test finished first.
pub const TIMEOUT_ATTACHMENT: &str = "specleft.timeout";

/// Attachment value paired with [`TIMEOUT_ATTACHMENT`].
pub const TIMEOUT_VALUE: &str = "timed out";

thread_local! {
    static CURRENT: Rc<StepContext> = StepContext::new();
}

struct Frame {
    id: u64,
    name: String,
    depth: usize,
    started_at: OffsetDateTime,
    panicking_at_open: bool,
    attachments: BTreeMap<String, String>,
    failure: Option<Failure>,
    child_status: Option<Status>,
    skip_reason: Option<String>,
}

struct ActiveTest {
    pending: PendingTest,
    frames: Vec<Frame>,
    records: Vec<StepRecord>,
    next_frame: u64,
}

/// Step stack and binding slot of one execution context.
///
/// Panics are classified from what a process panic hook captured, chained
/// in when the first [`crate::Session`] is built. Replacing the hook later
/// with [`std::panic::set_hook`] stops that capture until
/// [`reinstall_panic_hook`] is called.
pub struct StepContext {
    active: RefCell<Option<ActiveTest>>,
    generation: Cell<u64>,
}

impl StepContext {
    /// Create an unbound context.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            active: RefCell::new(None),
            generation: Cell::new(0),
        })
    }

    /// The context of the calling thread.
    #[must_use]
    pub fn current() -> Rc<Self> {
        CURRENT.try_with(Rc::clone).unwrap_or_else(|_| Self::new())
    }

    /// Bind `pending` to this context with an empty step stack.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::AlreadyBound`] when another test is bound.
    pub fn bind(&self, pending: PendingTest) -> SpecleftResult<()> {
        let mut active = self.active.borrow_mut();
        if let Some(current) = active.as_ref() {
            return Err(SpecleftError::AlreadyBound {
                test_id: current.pending.test_id().to_string(),
            });
        }
        panic::install();
        panic::clear();
        tracing::debug!(test = %pending.test_id(), "test bound to step context");
        *active = Some(ActiveTest {
            pending,
            frames: Vec::new(),
            records: Vec::new(),
            next_frame: 0,
        });
        self.generation.set(self.generation.get().wrapping_add(1));
        Ok(())
    }

    /// Detach the bound test and return its finished result.
    ///
    /// Steps still open are sealed as `error` with a
    /// [`TIMEOUT_ATTACHMENT`] attachment.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::NotBound`] when no test is bound.
    pub fn unbind(&self) -> SpecleftResult<TestResult> {
        self.finish(None)
    }

    /// Like [`StepContext::unbind`], recording `failure` as the test-level
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::NotBound`] when no test is bound.
    pub fn finish(&self, failure: Option<Failure>) -> SpecleftResult<TestResult> {
        let taken = self.active.borrow_mut().take();
        let Some(mut active) = taken else {
            return Err(SpecleftError::NotBound);
        };
        self.generation.set(self.generation.get().wrapping_add(1));
        let now = OffsetDateTime::now_utc();
        while let Some(frame) = active.frames.pop() {
            tracing::warn!(
                test = %active.pending.test_id(),
                step = %frame.name,
                "step still open when the test finished; sealing as error"
            );
            let message = format!("step '{}' was still open when the test finished", frame.name);
            let mut attachments = frame.attachments;
            attachments.insert(TIMEOUT_ATTACHMENT.to_owned(), TIMEOUT_VALUE.to_owned());
            active.records.push(StepRecord {
                name: frame.name,
                status: Status::Error,
                depth: frame.depth,
                started_at: frame.started_at,
                finished_at: now,
                failure: Some(Failure::error(message)),
                attachments,
            });
        }
        let result = active.pending.finish(active.records, failure);
        tracing::debug!(
            test = %result.test_id(),
            status = %result.status(),
            steps = result.steps().len(),
            "test unbound from step context"
        );
        Ok(result)
    }

    /// `true` while a test is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.active.borrow().is_some()
    }

    /// Name of the bound test.
    #[must_use]
    pub fn bound_test(&self) -> Option<TestId> {
        self.active
            .borrow()
            .as_ref()
            .map(|active| active.pending.test_id().clone())
    }

    /// Number of steps currently open.
    #[must_use]
    pub fn open_depth(&self) -> usize {
        self.active
            .borrow()
            .as_ref()
            .map_or(0, |active| active.frames.len())
    }

    /// Open a named step, sealed when the returned guard drops.
    ///
    /// # Errors
    ///
    /// Returns [`SpecleftError::NotBound`] when no test is bound.
    pub fn open_step(
        self: &Rc<Self>,
        name: impl Into<String>,
        attachments: Option<BTreeMap<String, String>>,
    ) -> SpecleftResult<StepGuard> {
        let mut slot = self.active.borrow_mut();
        let active = slot.as_mut().ok_or(SpecleftError::NotBound)?;
        let id = active.next_frame;
        active.next_frame += 1;
        active.frames.push(Frame {
            id,
            name: name.into(),
            depth: active.frames.len(),
            started_at: OffsetDateTime::now_utc(),
            panicking_at_open: thread::panicking(),
            attachments: attachments.unwrap_or_default(),
            failure: None,
            child_status: None,
            skip_reason: None,
        });
        Ok(StepGuard {
            handle: Some(FrameHandle {
                context: Rc::clone(self),
                generation: self.generation.get(),
                frame: id,
            }),
        })
    }

    /// Failure for the panic unwinding this thread, classified by the bound
    /// test's policy.
    pub(crate) fn panic_failure(&self) -> Option<Failure> {
        let active = self.active.borrow();
        let classifier = active.as_ref()?.pending.classifier();
        let capture = panic::current()
            .unwrap_or_else(|| PanicCapture::from_message("test panicked"));
        Some(panic_failure(classifier.as_ref(), &capture))
    }

    /// Failure for an `Err` value, classified by the bound test's policy.
    pub(crate) fn error_failure(&self, message: String) -> Failure {
        let kind = self.active.borrow().as_ref().map_or(FailureKind::Error, |active| {
            active.pending.classifier().classify_error(&message)
        });
        Failure::new(kind, message)
    }

    fn with_frame(&self, generation: u64, frame: u64, f: impl FnOnce(&mut Frame)) -> bool {
        if generation != self.generation.get() {
            return false;
        }
        let mut slot = self.active.borrow_mut();
        let found = slot
            .as_mut()
            .and_then(|active| active.frames.iter_mut().find(|open| open.id == frame));
        match found {
            Some(target) => {
                f(target);
                true
            }
            None => false,
        }
    }

    fn close_frame(&self, generation: u64, frame_id: u64) {
        if generation != self.generation.get() {
            return;
        }
        let mut slot = self.active.borrow_mut();
        let Some(active) = slot.as_mut() else {
            return;
        };
        let Some(position) = active.frames.iter().position(|f| f.id == frame_id) else {
            return;
        };
        let mut frame = active.frames.remove(position);
        if frame.failure.is_none() && thread::panicking() && !frame.panicking_at_open {
            let capture = panic::current()
                .unwrap_or_else(|| PanicCapture::from_message("step panicked"));
            frame.failure = Some(panic_failure(active.pending.classifier().as_ref(), &capture));
        }
        let own = match (&frame.failure, &frame.skip_reason) {
            (Some(failure), _) => failure.status(),
            (None, Some(_)) => Status::Skipped,
            (None, None) => Status::Passed,
        };
        let status = frame.child_status.map_or(own, |child| own.worst(child));
        if status.is_failing() {
            if let Some(parent) = position.checked_sub(1).and_then(|p| active.frames.get_mut(p)) {
                parent.child_status = Some(parent.child_status.map_or(status, |s| s.worst(status)));
            }
        }
        tracing::debug!(step = %frame.name, status = %status, "step sealed");
        if let Some(reason) = frame.skip_reason {
            frame.attachments.entry(String::from("skip_reason")).or_insert(reason);
        }
        active.records.push(StepRecord {
            name: frame.name,
            status,
            depth: frame.depth,
            started_at: frame.started_at,
            finished_at: OffsetDateTime::now_utc(),
            failure: frame.failure,
            attachments: frame.attachments,
        });
    }
}

struct FrameHandle {
    context: Rc<StepContext>,
    generation: u64,
    frame: u64,
}

/// Scope of one open step. Dropping it seals the step.
///
/// A guard whose test has already been unbound does nothing.
#[must_use = "dropping the guard seals the step immediately"]
pub struct StepGuard {
    handle: Option<FrameHandle>,
}

impl StepGuard {
    /// A guard that records nothing, used when no test is bound.
    #[must_use]
    pub const fn inert() -> Self {
        Self { handle: None }
    }

    /// `true` while the guard's step is open in a bound test.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| h.context.with_frame(h.generation, h.frame, |_| ()))
    }

    /// Attach a key/value pair to the step.
    pub fn attach(&self, key: impl Into<String>, value: impl Display) -> &Self {
        if let Some(h) = &self.handle {
            let (name, text) = (key.into(), value.to_string());
            h.context.with_frame(h.generation, h.frame, |frame| {
                frame.attachments.insert(name, text);
            });
        }
        self
    }

    /// Mark the step as failing without panicking.
    ///
    /// The most severe failure wins when called more than once.
    pub fn fail(&self, failure: Failure) -> &Self {
        if let Some(h) = &self.handle {
            h.context.with_frame(h.generation, h.frame, |frame| {
                let replace = frame.failure.as_ref().is_none_or(|current| {
                    failure.status().worst(current.status()) != current.status()
                });
                if replace {
                    frame.failure = Some(failure);
                }
            });
        }
        self
    }

    /// Mark the step as failing with an error value, classified by the bound
    /// test's policy.
    pub fn record_error(&self, error: &dyn Display) -> &Self {
        if let Some(h) = &self.handle {
            let failure = h.context.error_failure(error.to_string());
            self.fail(failure);
        }
        self
    }

    /// Seal the step as `skipped` now.
    pub fn skip(self, reason: impl Into<String>) {
        if let Some(h) = &self.handle {
            let text = reason.into();
            h.context.with_frame(h.generation, h.frame, |frame| {
                frame.skip_reason = Some(text);
            });
        }
    }
}

impl Drop for StepGuard {
    fn drop(&mut self) {
        if let Some(h) = self.handle.take() {
            h.context.close_frame(h.generation, h.frame);
        }
    }
}

/// Open a step on the calling thread's context.
///
/// Returns an inert guard when no test is bound, so instrumented helpers can
/// be called from untraced code.
pub fn step(name: impl Into<String>) -> StepGuard {
    StepContext::current()
        .open_step(name, None)
        .unwrap_or_else(|_| StepGuard::inert())
}

/// Run `body` inside a step named `name`.
pub fn step_with<T>(name: impl Into<String>, body: impl FnOnce() -> T) -> T {
    let _guard = step(name);
    body()
}

/// Run a fallible `body` inside a step named `name`.
///
/// An `Err` marks the step as failing and is returned unchanged.
///
/// # Errors
///
/// Returns whatever `body` returns.
pub fn try_step<T, E: Display>(
    name: impl Into<String>,
    body: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
    let guard = step(name);
    let outcome = body();
    if let Err(error) = &outcome {
        guard.record_error(error);
    }
    outcome
}

/// Record a step that did not run.
pub fn skip_step(name: impl Into<String>, reason: impl Into<String>) {
    step(name).skip(reason);
}

#[cfg(test)]
mod tests;
