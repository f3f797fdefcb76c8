//! Stage behaviours supplied by the host.
//!
//! The pipeline treats acquisition, transformation and presentation as opaque.
//! Each is a trait with a single method, and each has a blanket impl for
//! closures, so a host can pass either a stateful struct or a closure:
//!
//! ```
//! use framepipe::{Acquire, ImageBuffer, StageError};
//!
//! let mut frame_no = 0u8;
//! let mut camera = move |raw: &mut ImageBuffer, derived: &mut ImageBuffer| {
//!     frame_no = frame_no.wrapping_add(1);
//!     raw.reshape(4, 4, 3);
//!     raw.fill(frame_no);
//!     derived.reshape(2, 2, 3);
//!     derived.fill(frame_no);
//!     Ok::<(), StageError>(())
//! };
//!
//! let (mut raw, mut derived) = (ImageBuffer::default(), ImageBuffer::default());
//! camera.acquire(&mut raw, &mut derived).unwrap();
//! assert_eq!(raw.as_slice()[0], 1);
//! ```
//!
//! State the stage needs (device handles, model sessions, windows) lives in
//! the stage value itself.

use crate::error::StageError;

/// Produces one frame per call.
///
/// Runs on the acquisition worker thread. The buffers passed in are scratch
/// buffers owned by the worker, not pool memory, and they still hold an older
/// frame: overwrite them in place (e.g. with
/// [`ImageBuffer::reshape`](crate::ImageBuffer::reshape)) rather than
/// replacing them, so steady-state operation does not allocate.
pub trait Acquire<R, D>: Send {
    /// Fill `raw` and `derived` with the next frame.
    fn acquire(&mut self, raw: &mut R, derived: &mut D) -> Result<(), StageError>;
}

impl<R, D, F> Acquire<R, D> for F
where
    F: FnMut(&mut R, &mut D) -> Result<(), StageError> + Send,
{
    fn acquire(&mut self, raw: &mut R, derived: &mut D) -> Result<(), StageError> {
        self(raw, derived)
    }
}

/// Computes a result record from a derived image.
///
/// Runs on the transform worker thread, with no queue lock held.
pub trait Transform<D, O>: Send {
    /// Write the result for `input` into `output`.
    fn transform(&mut self, input: &D, output: &mut O) -> Result<(), StageError>;
}

impl<D, O, F> Transform<D, O> for F
where
    F: FnMut(&D, &mut O) -> Result<(), StageError> + Send,
{
    fn transform(&mut self, input: &D, output: &mut O) -> Result<(), StageError> {
        self(input, output)
    }
}

/// Consumes a finished frame.
///
/// Runs on the host's thread, inside
/// [`Pipeline::drain_once`](crate::Pipeline::drain_once). The returned status
/// code is handed back to the host untouched.
pub trait Present<R, O> {
    /// Present `raw` with its `output`; `throughput` is the last measured
    /// frames-per-second figure.
    fn present(&mut self, raw: &R, throughput: f32, output: &O) -> i32;
}

impl<R, O, F> Present<R, O> for F
where
    F: FnMut(&R, f32, &O) -> i32,
{
    fn present(&mut self, raw: &R, throughput: f32, output: &O) -> i32 {
        self(raw, throughput, output)
    }
}
