//! Background worker loops.
//!
//! Two long-lived threads feed the pipeline:
//!
//! - **Acquisition** runs the [`Acquire`] stage into worker-local scratch
//!   buffers, then claims an idle slot *without waiting*. If none is free the
//!   frame is dropped and the loop goes straight back to acquiring, so a slow
//!   consumer costs frames, never latency.
//! - **Transform** waits (bounded) for a pending slot, runs the [`Transform`]
//!   stage on it with no lock held, and always passes the slot on to `ready`,
//!   even when the stage failed, so no slot is ever lost.
//!
//! Both loops poll [`RunState`] once per iteration. A stage failure halts the
//! run state; the loop then exits at its next check.
//!
//! When acquisition is what failed, the frames it handed off before failing
//! are still owed to the host, so the transform worker finishes everything
//! left in `pending` before it exits. A plain stop or a transform failure
//! leaves `pending` as it is. The transform worker raises its [`ExitFlag`]
//! last, after which nothing more can reach `ready`.

use crate::error::StageKind;
use crate::observer::PipelineObserver;
use crate::run_state::{ExitFlag, RunState};
use crate::stage::{Acquire, Transform};
use crate::stats::PipelineStats;
use framepipe_pool::{Slot, SlotPool};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Everything a worker shares with the controller.
pub(crate) struct WorkerShared<R, D, O> {
    pub pool: Arc<SlotPool<R, D, O>>,
    pub run: RunState,
    pub stats: Arc<PipelineStats>,
    pub observer: Arc<dyn PipelineObserver>,
    pub wait_timeout: Duration,
    pub transform_exit: ExitFlag,
}

impl<R, D, O> Clone for WorkerShared<R, D, O> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            run: self.run.clone(),
            stats: Arc::clone(&self.stats),
            observer: Arc::clone(&self.observer),
            wait_timeout: self.wait_timeout,
            transform_exit: self.transform_exit.clone(),
        }
    }
}

/// Acquisition loop.
///
/// `raw` and `derived` are the worker's scratch buffers. On hand-off they are
/// swapped with the claimed slot's buffers, so the slot's previous buffers
/// become the next scratch pair and nothing is copied or allocated.
pub(crate) fn run_acquisition<R, D, O>(
    shared: WorkerShared<R, D, O>,
    mut stage: Box<dyn Acquire<R, D>>,
    mut raw: R,
    mut derived: D,
) {
    let WorkerShared {
        pool,
        run,
        stats,
        observer,
        ..
    } = shared;
    let _halt = run.halt_on_exit();
    observer.on_worker_started(StageKind::Acquire);

    while run.is_running() {
        if let Err(err) = stage.acquire(&mut raw, &mut derived) {
            stats.record_acquire_failure();
            observer.on_stage_failed(StageKind::Acquire, &err);
            run.fail(StageKind::Acquire);
            continue;
        }
        stats.record_acquired();

        let Some(mut slot) = pool.idle().try_take() else {
            // Downstream is saturated: drop this frame and acquire a fresh one.
            stats.record_dropped();
            observer.on_frame_dropped();
            std::thread::yield_now();
            continue;
        };

        std::mem::swap(&mut slot.raw, &mut raw);
        std::mem::swap(&mut slot.derived, &mut derived);
        pool.pending().give(slot);
    }

    observer.on_worker_stopped(StageKind::Acquire);
}

/// Transform loop.
pub(crate) fn run_transform<R, D, O>(
    shared: WorkerShared<R, D, O>,
    mut stage: Box<dyn Transform<D, O>>,
) {
    let WorkerShared {
        pool,
        run,
        stats,
        observer,
        wait_timeout,
        transform_exit,
    } = shared;
    let _exited = transform_exit.raise_on_exit();
    let _halt = run.halt_on_exit();
    observer.on_worker_started(StageKind::Transform);

    while run.is_running() {
        let Some(slot) = pool.pending().take_timeout(wait_timeout) else {
            continue;
        };
        if !transform_slot(&pool, &mut *stage, &*stats, &*observer, slot) {
            run.fail(StageKind::Transform);
        }
    }

    if run.failure() == Some(StageKind::Acquire) {
        let mut flushed = 0usize;
        while let Some(slot) = pool.pending().try_take() {
            flushed += 1;
            if !transform_slot(&pool, &mut *stage, &*stats, &*observer, slot) {
                break;
            }
        }
        debug!(flushed, "pending flushed after acquisition failure");
    }

    observer.on_worker_stopped(StageKind::Transform);
}

/// Run the stage on one slot and forward it to `ready`, whatever the outcome.
fn transform_slot<R, D, O, S>(
    pool: &SlotPool<R, D, O>,
    stage: &mut S,
    stats: &PipelineStats,
    observer: &dyn PipelineObserver,
    mut slot: Slot<R, D, O>,
) -> bool
where
    S: Transform<D, O> + ?Sized,
{
    let ok = match stage.transform(&slot.derived, &mut slot.output) {
        Ok(()) => {
            stats.record_transformed();
            true
        }
        Err(err) => {
            stats.record_transform_failure();
            observer.on_stage_failed(StageKind::Transform, &err);
            false
        }
    };
    pool.ready().give(slot);
    ok
}
