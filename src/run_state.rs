//! Shared run/stop signal.

use crate::error::StageKind;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

const NO_FAILURE: u8 = 0;

/// Cooperative cancellation flag shared by the controller, both workers and
/// the drain step.
///
/// Stores use `Release` and loads use `Acquire`, so everything a context did
/// before halting is visible to whoever observes the halt. That includes the
/// failing stage recorded by [`RunState::fail`].
#[derive(Debug, Clone, Default)]
pub struct RunState {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    running: AtomicBool,
    failed: AtomicU8,
}

impl RunState {
    /// Create a state that is not yet running.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the pipeline as running.
    pub fn start(&self) {
        self.inner.running.store(true, Ordering::Release);
    }

    /// Mark the pipeline as stopped. Returns whether it was running.
    pub fn halt(&self) -> bool {
        self.inner.running.swap(false, Ordering::AcqRel)
    }

    /// Record that `stage` failed, then halt. Only the first failure is kept.
    /// Returns whether the pipeline was running.
    pub fn fail(&self, stage: StageKind) -> bool {
        let _ = self.inner.failed.compare_exchange(
            NO_FAILURE,
            encode(stage),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.halt()
    }

    /// The stage whose failure halted the run, if any.
    #[must_use]
    pub fn failure(&self) -> Option<StageKind> {
        decode(self.inner.failed.load(Ordering::Acquire))
    }

    /// Whether the pipeline should keep going.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Guard that halts this state when dropped, including during unwinding.
    ///
    /// Each worker holds one so a panicking stage still ends the run instead
    /// of leaving the drain step waiting on a queue nobody will fill.
    #[must_use]
    pub(crate) fn halt_on_exit(&self) -> HaltOnExit {
        HaltOnExit(self.clone())
    }
}

fn encode(stage: StageKind) -> u8 {
    match stage {
        StageKind::Acquire => 1,
        StageKind::Transform => 2,
        StageKind::Present => 3,
    }
}

fn decode(raw: u8) -> Option<StageKind> {
    match raw {
        1 => Some(StageKind::Acquire),
        2 => Some(StageKind::Transform),
        3 => Some(StageKind::Present),
        _ => None,
    }
}

pub(crate) struct HaltOnExit(RunState);

impl Drop for HaltOnExit {
    fn drop(&mut self) {
        self.0.halt();
    }
}

/// One-shot flag a worker raises as its very last action, panicking or not.
///
/// Once it reads true the worker can no longer touch any queue.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExitFlag(Arc<AtomicBool>);

impl ExitFlag {
    pub(crate) fn has_exited(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    #[must_use]
    pub(crate) fn raise_on_exit(&self) -> RaiseOnExit {
        RaiseOnExit(self.clone())
    }
}

pub(crate) struct RaiseOnExit(ExitFlag);

impl Drop for RaiseOnExit {
    fn drop(&mut self) {
        (self.0).0.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_halt() {
        let state = RunState::new();
        assert!(!state.is_running());
        state.start();
        assert!(state.is_running());
        assert!(state.halt());
        assert!(!state.halt());
        assert!(!state.is_running());
    }

    #[test]
    fn clones_share_state() {
        let state = RunState::new();
        let other = state.clone();
        state.start();
        assert!(other.is_running());
    }

    #[test]
    fn guard_halts_on_panic() {
        let state = RunState::new();
        state.start();
        let worker_state = state.clone();
        let result = std::thread::spawn(move || {
            let _guard = worker_state.halt_on_exit();
            panic!("stage blew up");
        })
        .join();
        assert!(result.is_err());
        assert!(!state.is_running());
    }

    #[test]
    fn first_failure_wins() {
        let state = RunState::new();
        state.start();
        assert_eq!(state.failure(), None);

        assert!(state.fail(StageKind::Acquire));
        assert!(!state.is_running());
        assert!(!state.fail(StageKind::Transform));
        assert_eq!(state.failure(), Some(StageKind::Acquire));
    }

    #[test]
    fn plain_halt_records_no_failure() {
        let state = RunState::new();
        state.start();
        state.halt();
        assert_eq!(state.failure(), None);
    }

    #[test]
    fn exit_flag_raised_on_panic() {
        let flag = ExitFlag::default();
        let worker_flag = flag.clone();
        let result = std::thread::spawn(move || {
            let _raised = worker_flag.raise_on_exit();
            assert!(!worker_flag.has_exited());
            panic!("stage blew up");
        })
        .join();
        assert!(result.is_err());
        assert!(flag.has_exited());
    }
}
