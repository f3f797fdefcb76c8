//! Fixed slot pool for the three-stage frame pipeline.
//!
//! This crate owns the storage side of the pipeline: a fixed set of N reusable
//! [`Slot`]s and the three [`StageQueue`]s (`idle`, `pending`, `ready`) that
//! partition them. Nothing in here allocates after [`SlotPool::new`] returns:
//! each queue reserves room for every slot up front and slots are moved by
//! value between queues, so buffers are overwritten in place, never reallocated.
//!
//! # Ownership Model
//!
//! A [`Slot`] is an owned value. Taking it from a queue moves it out; giving it
//! to a queue moves it in. At any instant a slot therefore lives in exactly one
//! place:
//!
//! ```text
//!   idle ──try_take──▶ [acquire] ──give──▶ pending
//!                                            │
//!                                    take_timeout
//!                                            ▼
//!   idle ◀──give── [present] ◀──try_take── ready ◀──give── [transform]
//! ```
//!
//! Handles cannot alias because there is only ever one value per [`SlotId`].
//!
//! # Example
//!
//! ```
//! use framepipe_pool::{ImageBuffer, SlotPool};
//!
//! let pool = SlotPool::<ImageBuffer, ImageBuffer, u32>::with_defaults(4).unwrap();
//! assert_eq!(pool.occupancy().idle, 4);
//!
//! let mut slot = pool.idle().try_take().unwrap();
//! slot.output = 7;
//! pool.pending().give(slot);
//!
//! let occupancy = pool.occupancy();
//! assert_eq!((occupancy.idle, occupancy.pending), (3, 1));
//! ```

pub mod image;
pub mod stage_queue;

pub use image::ImageBuffer;
pub use stage_queue::StageQueue;

use std::fmt;
use thiserror::Error;
use tracing::info;

/// Errors raised by the pool and its buffers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A pool needs at least one slot to make progress.
    #[error("slot pool must contain at least one slot")]
    Empty,

    /// Pixel data did not match the requested image geometry.
    #[error("image data is {actual} bytes, geometry needs {expected}")]
    ImageSize {
        /// Bytes implied by width, height and channels.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
}

/// Stable identity of a slot, its index in `0..capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(usize);

impl SlotId {
    /// Index of this slot within its pool.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// One reusable unit of pipeline storage.
///
/// Holds the raw image (for presentation), the derived image (for the
/// transform stage) and the result record the transform writes.
#[derive(Debug)]
pub struct Slot<R, D, O> {
    id: SlotId,
    /// Frame as acquired, handed to presentation.
    pub raw: R,
    /// Frame prepared for the transform stage.
    pub derived: D,
    /// Result record written by the transform stage.
    pub output: O,
}

impl<R, D, O> Slot<R, D, O> {
    /// Stable identity of this slot.
    #[must_use]
    pub fn id(&self) -> SlotId {
        self.id
    }
}

/// Per-queue slot counts at one observation point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Occupancy {
    /// Slots waiting to be filled by acquisition.
    pub idle: usize,
    /// Slots waiting for the transform stage.
    pub pending: usize,
    /// Slots waiting to be presented.
    pub ready: usize,
    /// Slots currently held by a stage.
    pub in_flight: usize,
}

impl Occupancy {
    /// Total slots accounted for, queued or held.
    #[must_use]
    pub fn total(&self) -> usize {
        self.idle + self.pending + self.ready + self.in_flight
    }
}

/// Fixed set of slots partitioned across the three stage queues.
///
/// The three queue locks are independent; no method here holds more than one
/// of them at a time.
pub struct SlotPool<R, D, O> {
    idle: StageQueue<Slot<R, D, O>>,
    pending: StageQueue<Slot<R, D, O>>,
    ready: StageQueue<Slot<R, D, O>>,
    capacity: usize,
}

impl<R, D, O> SlotPool<R, D, O> {
    /// Create a pool of `capacity` slots, every one of them starting in `idle`
    /// in id order.
    ///
    /// `factory` is called once per slot with its id and returns the initial
    /// `(raw, derived, output)` contents.
    pub fn new<F>(capacity: usize, mut factory: F) -> Result<Self, PoolError>
    where
        F: FnMut(SlotId) -> (R, D, O),
    {
        if capacity == 0 {
            return Err(PoolError::Empty);
        }

        let idle = StageQueue::with_capacity("idle", capacity);
        for index in 0..capacity {
            let id = SlotId(index);
            let (raw, derived, output) = factory(id);
            idle.give(Slot {
                id,
                raw,
                derived,
                output,
            });
        }

        info!(capacity, "SlotPool created");

        Ok(Self {
            idle,
            pending: StageQueue::with_capacity("pending", capacity),
            ready: StageQueue::with_capacity("ready", capacity),
            capacity,
        })
    }

    /// Total number of slots, fixed for the pool's lifetime.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots free for acquisition.
    #[must_use]
    pub fn idle(&self) -> &StageQueue<Slot<R, D, O>> {
        &self.idle
    }

    /// Slots acquired and awaiting transform.
    #[must_use]
    pub fn pending(&self) -> &StageQueue<Slot<R, D, O>> {
        &self.pending
    }

    /// Slots transformed and awaiting presentation.
    #[must_use]
    pub fn ready(&self) -> &StageQueue<Slot<R, D, O>> {
        &self.ready
    }

    /// Count slots per queue; whatever is missing is held by a stage.
    ///
    /// Queues are read against the flow direction (`ready`, `pending`,
    /// `idle`), so a slot moving forward between two reads shows up as in
    /// flight rather than being counted twice. The one backward edge,
    /// `ready` → `idle`, is driven by the drain step, so call this from the
    /// draining thread for a view that never over-counts.
    #[must_use]
    pub fn occupancy(&self) -> Occupancy {
        let ready = self.ready.len();
        let pending = self.pending.len();
        let idle = self.idle.len();
        Occupancy {
            idle,
            pending,
            ready,
            in_flight: self.capacity.saturating_sub(idle + pending + ready),
        }
    }
}

impl<R: Default, D: Default, O: Default> SlotPool<R, D, O> {
    /// Create a pool whose slots start from `Default` contents.
    pub fn with_defaults(capacity: usize) -> Result<Self, PoolError> {
        Self::new(capacity, |_| (R::default(), D::default(), O::default()))
    }
}
