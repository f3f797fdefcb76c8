//! FIFO hand-off queue between two pipeline stages.
//!
//! Each queue owns its own `parking_lot::Mutex` and `Condvar`. The lock is held
//! only for the queue mutation itself: callers take an item, the guard drops,
//! and only then do they run any stage work on it. Since every method touches
//! exactly one queue there is no lock ordering between queues to get wrong.

use crate::{Slot, SlotId};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::trace;

/// Strict FIFO queue with a timed wait for "not empty".
pub struct StageQueue<T> {
    name: &'static str,
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
}

impl<T> StageQueue<T> {
    /// Create an empty queue with room for `capacity` items.
    ///
    /// A pool sizes every queue for all of its slots, so `give` never has to
    /// grow the backing storage.
    #[must_use]
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
        }
    }

    /// Queue name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Remove the head item without waiting.
    ///
    /// Returns `None` if the queue is empty.
    #[must_use]
    pub fn try_take(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Remove the head item, waiting up to `timeout` if the queue is empty.
    ///
    /// Waits at most once: a spurious wakeup or [`StageQueue::wake_all`] makes
    /// this return `None` early so the caller can re-check its run state.
    #[must_use]
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let mut items = self.items.lock();
        if items.is_empty() {
            let result = self.not_empty.wait_for(&mut items, timeout);
            if result.timed_out() {
                trace!(queue = self.name, "wait timed out");
            }
        }
        items.pop_front()
    }

    /// Wait up to `timeout` for the queue to become non-empty without taking
    /// anything. Returns whether an item is available afterwards.
    pub fn wait_for_item(&self, timeout: Duration) -> bool {
        let mut items = self.items.lock();
        if items.is_empty() {
            self.not_empty.wait_for(&mut items, timeout);
        }
        !items.is_empty()
    }

    /// Append an item to the tail and wake every waiter.
    pub fn give(&self, item: T) {
        self.items.lock().push_back(item);
        self.not_empty.notify_all();
    }

    /// Wake every waiter without changing the queue.
    ///
    /// Used at shutdown so timed waits end now instead of at their timeout.
    pub fn wake_all(&self) {
        let woken = self.not_empty.notify_all();
        if woken > 0 {
            trace!(queue = self.name, woken, "woke waiters");
        }
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<R, D, O> StageQueue<Slot<R, D, O>> {
    /// Ids of the queued slots, head first.
    #[must_use]
    pub fn ids(&self) -> Vec<SlotId> {
        self.items.lock().iter().map(Slot::id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_fifo_order() {
        let queue = StageQueue::with_capacity("test", 4);
        for i in 0..4 {
            queue.give(i);
        }
        let drained: Vec<i32> = std::iter::from_fn(|| queue.try_take()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_try_take_empty() {
        let queue: StageQueue<u8> = StageQueue::with_capacity("test", 1);
        assert!(queue.try_take().is_none());
    }

    #[test]
    fn test_take_timeout_expires() {
        let queue: StageQueue<u8> = StageQueue::with_capacity("test", 1);
        let start = Instant::now();
        assert!(queue.take_timeout(Duration::from_millis(20)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_take_timeout_returns_queued_item_immediately() {
        let queue = StageQueue::with_capacity("test", 1);
        queue.give(9u8);
        let start = Instant::now();
        assert_eq!(queue.take_timeout(Duration::from_secs(5)), Some(9));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_give_wakes_waiter() {
        let queue = Arc::new(StageQueue::with_capacity("test", 1));
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take_timeout(Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(20));
        queue.give(42u32);

        let start = Instant::now();
        let taken = waiter.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
        // The waiter either saw the item or woke early and returned None;
        // in both cases the item must not be lost.
        match taken {
            Some(v) => assert_eq!(v, 42),
            None => assert_eq!(queue.try_take(), Some(42)),
        }
    }

    #[test]
    fn test_wake_all_ends_wait_early() {
        let queue: Arc<StageQueue<u8>> = Arc::new(StageQueue::with_capacity("test", 1));
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let start = Instant::now();
                let _ = queue.take_timeout(Duration::from_secs(10));
                start.elapsed()
            })
        };

        // Keep waking until the waiter has actually parked and left.
        let deadline = Instant::now() + Duration::from_secs(2);
        while !waiter.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
            queue.wake_all();
        }

        let waited = waiter.join().unwrap();
        assert!(waited < Duration::from_secs(5), "waited {waited:?}");
    }

    #[test]
    fn test_wait_for_item_does_not_take() {
        let queue = StageQueue::with_capacity("test", 1);
        assert!(!queue.wait_for_item(Duration::from_millis(5)));
        queue.give(1u8);
        assert!(queue.wait_for_item(Duration::from_millis(5)));
        assert_eq!(queue.len(), 1);
    }
}
