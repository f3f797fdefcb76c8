//! Pipeline controller and drain step.
//!
//! [`PipelineBuilder`] collects the three stages and starts the two background
//! workers; the host then calls [`Pipeline::drain_once`] from its own loop
//! (typically once per display tick) until it returns [`Drain::Stopped`].
//!
//! # Lifecycle
//!
//! ```text
//! PipelineBuilder::new(config)
//!     .acquire(..).transform(..).present(..)
//!     .start()?             ──▶ running: workers spawned
//! loop { drain_once() }     ──▶ Presented(code) | NoFrame | Stopped
//! stop()                    ──▶ halt, grace, wake waiters, join
//! ```
//!
//! # Shutdown
//!
//! `stop` clears the run state, waits the configured grace interval so workers
//! can observe it, then wakes any timed wait on `pending` and `ready` before
//! joining. Shutdown latency is therefore bounded by the grace interval plus
//! the duration of whatever stage call is in progress, not by the wait timeout.
//!
//! A stage failure halts the run state the same way. The host sees it as
//! `drain_once` returning `Stopped` once the transform worker has exited and
//! `ready` has been emptied. From then on every call returns `Stopped`.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, StageKind};
use crate::observer::{PipelineObserver, TracingObserver};
use crate::rate::RateMeter;
use crate::run_state::{ExitFlag, RunState};
use crate::stage::{Acquire, Present, Transform};
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::worker::{run_acquisition, run_transform, WorkerShared};
use framepipe_pool::{Occupancy, SlotPool};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Outcome of one [`Pipeline::drain_once`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Drain {
    /// A frame was presented; carries the presentation stage's status code.
    Presented(i32),
    /// Nothing was ready within the wait bound. Call again.
    NoFrame,
    /// The pipeline has stopped and `ready` is empty. Stop calling.
    Stopped,
}

impl Drain {
    /// Whether this is the terminal result.
    #[must_use]
    pub fn is_stopped(self) -> bool {
        matches!(self, Drain::Stopped)
    }
}

/// Collects stages and configuration, then starts a [`Pipeline`].
///
/// `R`, `D` and `O` are the raw image, derived image and result types held
/// by every slot.
pub struct PipelineBuilder<R, D, O> {
    config: PipelineConfig,
    acquire: Option<Box<dyn Acquire<R, D>>>,
    transform: Option<Box<dyn Transform<D, O>>>,
    present: Option<Box<dyn Present<R, O>>>,
    observer: Arc<dyn PipelineObserver>,
}

impl<R, D, O> PipelineBuilder<R, D, O>
where
    R: Default + Send + 'static,
    D: Default + Send + 'static,
    O: Default + Send + 'static,
{
    /// Start a builder with the given configuration and the tracing observer.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            acquire: None,
            transform: None,
            present: None,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Set the acquisition stage.
    #[must_use]
    pub fn acquire(mut self, stage: impl Acquire<R, D> + 'static) -> Self {
        self.acquire = Some(Box::new(stage));
        self
    }

    /// Set the transform stage.
    #[must_use]
    pub fn transform(mut self, stage: impl Transform<D, O> + 'static) -> Self {
        self.transform = Some(Box::new(stage));
        self
    }

    /// Set the presentation stage.
    #[must_use]
    pub fn present(mut self, stage: impl Present<R, O> + 'static) -> Self {
        self.present = Some(Box::new(stage));
        self
    }

    /// Replace the default [`TracingObserver`].
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Validate, build the slot pool and spawn both workers.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::MissingStage`] if any stage was not supplied
    /// - [`PipelineError::InvalidConfig`] if the configuration fails validation
    /// - [`PipelineError::Spawn`] if a worker thread could not be created
    pub fn start(self) -> PipelineResult<Pipeline<R, D, O>> {
        let acquire = self
            .acquire
            .ok_or(PipelineError::MissingStage(StageKind::Acquire))?;
        let transform = self
            .transform
            .ok_or(PipelineError::MissingStage(StageKind::Transform))?;
        let present = self
            .present
            .ok_or(PipelineError::MissingStage(StageKind::Present))?;
        self.config.validate()?;

        let pool = Arc::new(SlotPool::with_defaults(self.config.slot_count)?);
        let run = RunState::new();
        let shared = WorkerShared {
            pool: Arc::clone(&pool),
            run: run.clone(),
            stats: Arc::new(PipelineStats::default()),
            observer: Arc::clone(&self.observer),
            wait_timeout: self.config.wait_timeout(),
            transform_exit: ExitFlag::default(),
        };

        let mut pipeline = Pipeline {
            pool,
            run,
            stats: Arc::clone(&shared.stats),
            observer: self.observer,
            present,
            rate: RateMeter::new(self.config.rate_window()),
            wait_timeout: self.config.wait_timeout(),
            shutdown_grace: self.config.shutdown_grace(),
            transform_exit: shared.transform_exit.clone(),
            terminal: false,
            workers: Vec::with_capacity(2),
        };

        pipeline.run.start();
        pipeline.rate.reset(Instant::now());

        let acquisition = {
            let shared = shared.clone();
            spawn_worker(StageKind::Acquire, move || {
                run_acquisition(shared, acquire, R::default(), D::default());
            })
        };
        // On error the partially started pipeline is dropped, which stops it.
        pipeline.workers.push(acquisition?);
        pipeline
            .workers
            .push(spawn_worker(StageKind::Transform, move || {
                run_transform(shared, transform);
            })?);

        info!(
            slots = pipeline.pool.capacity(),
            wait_timeout_ms = self.config.wait_timeout_ms,
            "pipeline started"
        );
        Ok(pipeline)
    }
}

fn spawn_worker<F>(stage: StageKind, body: F) -> PipelineResult<Worker>
where
    F: FnOnce() + Send + 'static,
{
    let handle = thread::Builder::new()
        .name(stage.thread_name().to_string())
        .spawn(body)
        .map_err(|source| PipelineError::Spawn {
            worker: stage,
            source,
        })?;
    Ok(Worker { stage, handle })
}

struct Worker {
    stage: StageKind,
    handle: JoinHandle<()>,
}

/// A running three-stage pipeline.
///
/// Owns the presentation stage and the throughput meter; the acquisition and
/// transform stages live on their worker threads. Dropping the pipeline stops
/// it.
pub struct Pipeline<R, D, O> {
    pool: Arc<SlotPool<R, D, O>>,
    run: RunState,
    stats: Arc<PipelineStats>,
    observer: Arc<dyn PipelineObserver>,
    present: Box<dyn Present<R, O>>,
    rate: RateMeter,
    wait_timeout: Duration,
    shutdown_grace: Duration,
    transform_exit: ExitFlag,
    terminal: bool,
    workers: Vec<Worker>,
}

impl<R, D, O> Pipeline<R, D, O> {
    /// Present at most one finished frame.
    ///
    /// - `ready` empty, transform worker still alive: waits up to the wait
    ///   timeout for a frame, then returns [`Drain::NoFrame`] without
    ///   presenting.
    /// - `ready` empty, transform worker gone: returns [`Drain::Stopped`], and
    ///   so does every later call.
    /// - otherwise: presents the oldest ready frame and returns the
    ///   presentation stage's status as [`Drain::Presented`].
    pub fn drain_once(&mut self) -> Drain {
        if self.terminal {
            return Drain::Stopped;
        }

        // Read before taking: once the transform worker is gone nothing else
        // can land in `ready`, so an empty queue after this point is final.
        let upstream_done = self.transform_exit.has_exited();
        let Some(slot) = self.pool.ready().try_take() else {
            if upstream_done {
                self.terminal = true;
                return Drain::Stopped;
            }
            self.pool.ready().wait_for_item(self.wait_timeout);
            return Drain::NoFrame;
        };

        if let Some(fps) = self.rate.tick() {
            self.observer.on_throughput(fps);
        }

        let status = self
            .present
            .present(&slot.raw, self.rate.throughput(), &slot.output);
        self.stats.record_presented();

        self.pool.idle().give(slot);
        Drain::Presented(status)
    }

    /// Stop both workers and wait for them to exit.
    ///
    /// Safe to call more than once; later calls return immediately. Frames
    /// still in `ready` stay there and can be drained afterwards.
    pub fn stop(&mut self) {
        if self.workers.is_empty() {
            self.run.halt();
            return;
        }

        info!("stopping pipeline");
        self.run.halt();
        thread::sleep(self.shutdown_grace);

        self.pool.pending().wake_all();
        self.pool.ready().wake_all();

        for worker in self.workers.drain(..) {
            if worker.handle.join().is_err() {
                error!(stage = %worker.stage, "worker thread panicked");
            } else {
                debug!(stage = %worker.stage, "worker joined");
            }
        }
        info!(stats = ?self.stats.snapshot(), "pipeline stopped");
    }

    /// Whether the run state is still set.
    ///
    /// Turns false on [`Pipeline::stop`] or after any stage failure.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run.is_running()
    }

    /// Number of slots in the pool.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.pool.capacity()
    }

    /// Lifetime frame counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Where the slots are right now.
    ///
    /// Never over-counts when called from the thread that drains; exact once
    /// the pipeline is stopped.
    #[must_use]
    pub fn occupancy(&self) -> Occupancy {
        self.pool.occupancy()
    }

    /// Last measured frames per second.
    #[must_use]
    pub fn throughput(&self) -> f32 {
        self.rate.throughput()
    }
}

impl<R, D, O> Drop for Pipeline<R, D, O> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;

    fn fast_config(slots: usize) -> PipelineConfig {
        PipelineConfig {
            slot_count: slots,
            wait_timeout_ms: 20,
            shutdown_grace_ms: 1,
            ..Default::default()
        }
    }

    fn acquire_counter() -> impl Acquire<u32, u32> {
        let mut next = 0u32;
        move |raw: &mut u32, derived: &mut u32| {
            next += 1;
            *raw = next;
            *derived = next;
            Ok::<(), StageError>(())
        }
    }

    #[test]
    fn missing_stages_are_rejected() {
        let err = PipelineBuilder::<u32, u32, u32>::new(fast_config(2))
            .transform(|_: &u32, _: &mut u32| Ok::<(), StageError>(()))
            .present(|_: &u32, _: f32, _: &u32| 0)
            .start()
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::MissingStage(StageKind::Acquire)));

        let err = PipelineBuilder::<u32, u32, u32>::new(fast_config(2))
            .acquire(acquire_counter())
            .present(|_: &u32, _: f32, _: &u32| 0)
            .start()
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::MissingStage(StageKind::Transform)));

        let err = PipelineBuilder::<u32, u32, u32>::new(fast_config(2))
            .acquire(acquire_counter())
            .transform(|_: &u32, _: &mut u32| Ok::<(), StageError>(()))
            .start()
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::MissingStage(StageKind::Present)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = PipelineBuilder::<u32, u32, u32>::new(fast_config(0))
            .acquire(acquire_counter())
            .transform(|_: &u32, _: &mut u32| Ok::<(), StageError>(()))
            .present(|_: &u32, _: f32, _: &u32| 0)
            .start()
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn presents_frames_then_stops() {
        let mut pipeline = PipelineBuilder::new(fast_config(2))
            .acquire(acquire_counter())
            .transform(|input: &u32, output: &mut u32| {
                *output = input * 2;
                Ok::<(), StageError>(())
            })
            .present(|raw: &u32, _: f32, output: &u32| {
                assert_eq!(*output, raw * 2);
                0
            })
            .start()
            .unwrap();

        let mut presented = 0;
        for _ in 0..200 {
            match pipeline.drain_once() {
                Drain::Presented(code) => {
                    assert_eq!(code, 0);
                    presented += 1;
                }
                Drain::NoFrame => {}
                Drain::Stopped => panic!("stopped while running"),
            }
            if presented >= 10 {
                break;
            }
        }
        assert!(presented >= 10);

        pipeline.stop();
        assert!(!pipeline.is_running());
        assert_eq!(pipeline.occupancy().in_flight, 0);

        let mut tail = 0;
        while pipeline.drain_once() != Drain::Stopped {
            tail += 1;
            assert!(tail <= 2, "more frames than slots after stop");
        }
        let occupancy = pipeline.occupancy();
        assert_eq!(occupancy.ready, 0);
        assert_eq!(occupancy.idle + occupancy.pending, 2);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut pipeline = PipelineBuilder::new(fast_config(2))
            .acquire(acquire_counter())
            .transform(|_: &u32, _: &mut u32| Ok::<(), StageError>(()))
            .present(|_: &u32, _: f32, _: &u32| 0)
            .start()
            .unwrap();

        pipeline.stop();
        let start = Instant::now();
        pipeline.stop();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn presentation_status_passes_through() {
        let mut pipeline = PipelineBuilder::new(fast_config(2))
            .acquire(acquire_counter())
            .transform(|_: &u32, _: &mut u32| Ok::<(), StageError>(()))
            .present(|raw: &u32, _: f32, _: &u32| -(*raw as i32))
            .start()
            .unwrap();

        let first = loop {
            if let Drain::Presented(code) = pipeline.drain_once() {
                break code;
            }
        };
        assert_eq!(first, -1);
    }
}
