//! # framepipe
//!
//! A fixed-latency, three-stage frame pipeline. Acquisition, transformation and
//! presentation run overlapped on three execution contexts while sharing a
//! bounded pool of reusable slots, so steady-state operation never allocates
//! per frame.
//!
//! ```text
//!           ┌──────────── idle ◀─────────────┐
//!           ▼                                │
//!   [acquire thread] ──▶ pending ──▶ [transform thread] ──▶ ready ──▶ [host: drain_once]
//! ```
//!
//! The caller supplies the three stage behaviours; this crate owns the
//! synchronization between them: the slot pool, the three hand-off queues,
//! the two worker loops, the drain step, and the shutdown protocol.
//!
//! ## Crate Structure
//!
//! - **`pipeline`**: [`PipelineBuilder`], [`Pipeline`] and the [`Drain`] result
//!   of the caller-driven drain step.
//! - **`stage`**: the [`Acquire`], [`Transform`] and [`Present`] traits, with
//!   blanket impls for closures.
//! - **`worker`**: the acquisition and transform loops (crate-private).
//! - **`observer`**: [`PipelineObserver`] hooks and the default
//!   [`TracingObserver`].
//! - **`config`**: [`PipelineConfig`], loaded with Figment from TOML and
//!   `FRAMEPIPE_` environment variables.
//! - **`telemetry`**: `tracing-subscriber` setup for hosts without their own.
//! - **`error`**: [`PipelineError`] and [`StageError`].
//! - **`rate`**, **`stats`**, **`run_state`**: throughput meter, lifetime
//!   counters and the shared run/stop signal.
//!
//! Slot storage and the queues live in the `framepipe-pool` crate and are
//! re-exported here.
//!
//! ## Example
//!
//! ```no_run
//! use framepipe::{Drain, ImageBuffer, PipelineBuilder, PipelineConfig, StageError};
//!
//! # fn main() -> Result<(), framepipe::PipelineError> {
//! let mut pipeline = PipelineBuilder::new(PipelineConfig::default())
//!     .acquire(|raw: &mut ImageBuffer, derived: &mut ImageBuffer| {
//!         raw.reshape(640, 480, 3);
//!         derived.reshape(320, 240, 3);
//!         Ok::<(), StageError>(())
//!     })
//!     .transform(|derived: &ImageBuffer, mean: &mut f32| {
//!         let sum: u64 = derived.as_slice().iter().map(|&b| u64::from(b)).sum();
//!         *mean = sum as f32 / derived.as_slice().len().max(1) as f32;
//!         Ok::<(), StageError>(())
//!     })
//!     .present(|_raw: &ImageBuffer, fps: f32, mean: &f32| {
//!         println!("{fps:5.2} fps, mean {mean}");
//!         0
//!     })
//!     .start()?;
//!
//! while !pipeline.drain_once().is_stopped() {
//!     # break;
//! }
//! pipeline.stop();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod observer;
pub mod pipeline;
pub mod rate;
pub mod run_state;
pub mod stage;
pub mod stats;
pub mod telemetry;
mod worker;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult, StageError, StageKind};
pub use observer::{PipelineObserver, TracingObserver};
pub use pipeline::{Drain, Pipeline, PipelineBuilder};
pub use stage::{Acquire, Present, Transform};
pub use stats::StatsSnapshot;

pub use framepipe_pool::{ImageBuffer, Occupancy, Slot, SlotId};
