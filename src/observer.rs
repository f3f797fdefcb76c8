//! Pipeline event hooks.
//!
//! A [`PipelineObserver`] is notified at the points where the pipeline has
//! something to report: a worker starting or stopping, a stage failing, a
//! frame dropped because every slot was busy, and each new throughput figure.
//! [`TracingObserver`] is the default and turns each event into a `tracing`
//! event; hosts can supply their own to drive a status bar or metrics.
//!
//! # Threading
//!
//! Hooks run inline on the thread that raised the event: the acquisition
//! worker, the transform worker, or the host thread inside `drain_once`. They
//! are called with no queue lock held, but they still sit on the hot path,
//! so implementations must return quickly.

use crate::error::{StageError, StageKind};
use tracing::{error, info, trace};

/// Receives pipeline lifecycle and rate events.
///
/// All methods default to doing nothing.
pub trait PipelineObserver: Send + Sync {
    /// A background worker entered its loop.
    fn on_worker_started(&self, _stage: StageKind) {}

    /// A background worker left its loop.
    fn on_worker_stopped(&self, _stage: StageKind) {}

    /// A stage reported failure; the pipeline is now halting.
    fn on_stage_failed(&self, _stage: StageKind, _error: &StageError) {}

    /// An acquired frame was discarded because no idle slot was free.
    fn on_frame_dropped(&self) {}

    /// A measurement window closed with this many frames per second.
    fn on_throughput(&self, _frames_per_sec: f32) {}
}

/// Observer that logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_worker_started(&self, stage: StageKind) {
        info!(%stage, "{} thread start", stage.thread_name());
    }

    fn on_worker_stopped(&self, stage: StageKind) {
        info!(%stage, "{} thread terminate", stage.thread_name());
    }

    fn on_stage_failed(&self, stage: StageKind, err: &StageError) {
        error!(%stage, code = err.code(), error = %err, "{stage} stage failed, stopping pipeline");
    }

    fn on_frame_dropped(&self) {
        trace!("no idle slot, frame dropped");
    }

    fn on_throughput(&self, frames_per_sec: f32) {
        info!(fps = frames_per_sec, "throughput {:5.2} fps", frames_per_sec);
    }
}
