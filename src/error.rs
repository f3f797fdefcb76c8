//! Error types for the pipeline.
//!
//! Two error types cover the whole crate:
//!
//! - **`PipelineError`**: raised synchronously by the controller. A missing
//!   stage or an invalid configuration is caught in
//!   [`PipelineBuilder::start`](crate::PipelineBuilder::start) and the
//!   pipeline never starts.
//! - **`StageError`**: returned by caller-supplied stages. The pipeline never
//!   retries a failed stage and never surfaces the error to the drain caller;
//!   a failure only halts the run state, which drains the pipeline into the
//!   terminal [`Drain::Stopped`](crate::Drain::Stopped) result.
//!
//! Presentation has no error type: its status code is passed through verbatim.

use framepipe_pool::PoolError;
use std::fmt;
use thiserror::Error;

/// Convenience alias for results using the pipeline error type.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// The three stage behaviours a pipeline needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Produces raw and derived images.
    Acquire,
    /// Computes a result from the derived image.
    Transform,
    /// Consumes the raw image, throughput and result.
    Present,
}

impl StageKind {
    /// Name given to the worker thread that runs this stage.
    #[must_use]
    pub fn thread_name(self) -> &'static str {
        match self {
            StageKind::Acquire => "framepipe-acquire",
            StageKind::Transform => "framepipe-transform",
            StageKind::Present => "framepipe-present",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageKind::Acquire => "acquire",
            StageKind::Transform => "transform",
            StageKind::Present => "present",
        };
        write!(f, "{}", label)
    }
}

/// Controller-level errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required stage was not supplied before `start`.
    #[error("Invalid argument: no {0} stage supplied")]
    MissingStage(StageKind),

    /// Configuration loaded but holds values the pipeline cannot run with.
    #[error("Configuration validation error: {0}")]
    InvalidConfig(String),

    /// Configuration could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// The slot pool or one of its buffers rejected an operation.
    #[error("Slot pool error: {0}")]
    Pool(#[from] PoolError),

    /// The OS refused to create a worker thread.
    #[error("Failed to spawn {worker} worker: {source}")]
    Spawn {
        /// Stage whose worker failed to start.
        worker: StageKind,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The global tracing subscriber could not be installed.
    #[error("Failed to initialize tracing: {0}")]
    Telemetry(String),
}

/// Failure reported by an acquisition or transform stage.
///
/// Carries the stage's negative status code alongside a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("stage failed with status {code}: {message}")]
pub struct StageError {
    code: i32,
    message: String,
}

impl StageError {
    /// Build an error from a status code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Build an error from a bare status code.
    #[must_use]
    pub fn from_status(code: i32) -> Self {
        Self::new(code, "stage returned a failure status")
    }

    /// Status code reported by the stage.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Human-readable failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
