//! Windowed throughput measurement for the drain step.

use std::time::{Duration, Instant};

/// Counts drained frames and turns them into frames per second once per
/// measurement window.
///
/// Owned by the drain step; nothing else touches it, so it needs no locking.
#[derive(Debug, Clone)]
pub struct RateMeter {
    window: Duration,
    anchor: Instant,
    frames: u32,
    throughput: f32,
}

impl RateMeter {
    /// Create a meter anchored now.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            anchor: Instant::now(),
            frames: 0,
            throughput: 0.0,
        }
    }

    /// Restart the measurement window at `now`, discarding partial counts.
    ///
    /// The last computed throughput is kept.
    pub fn reset(&mut self, now: Instant) {
        self.anchor = now;
        self.frames = 0;
    }

    /// Count one frame at the current time. See [`RateMeter::tick_at`].
    pub fn tick(&mut self) -> Option<f32> {
        self.tick_at(Instant::now())
    }

    /// Count one frame at `now`.
    ///
    /// Returns the new throughput when at least one window has elapsed since
    /// the anchor; the counter and anchor are then reset to `now`.
    pub fn tick_at(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.anchor);
        if elapsed < self.window {
            return None;
        }

        self.throughput = self.frames as f32 / elapsed.as_secs_f32();
        self.reset(now);
        Some(self.throughput)
    }

    /// Most recently computed frames per second, `0.0` before the first
    /// window closes.
    #[must_use]
    pub fn throughput(&self) -> f32 {
        self.throughput
    }

    /// Frames counted in the current window.
    #[must_use]
    pub fn frames_in_window(&self) -> u32 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_report_inside_window() {
        let start = Instant::now();
        let mut meter = RateMeter::new(Duration::from_secs(1));
        meter.reset(start);

        for i in 1..=10 {
            assert_eq!(meter.tick_at(start + Duration::from_millis(i * 50)), None);
        }
        assert_eq!(meter.frames_in_window(), 10);
        assert_eq!(meter.throughput(), 0.0);
    }

    #[test]
    fn reports_and_resets_when_window_elapses() {
        let start = Instant::now();
        let mut meter = RateMeter::new(Duration::from_secs(1));
        meter.reset(start);

        for i in 1..30 {
            assert!(meter.tick_at(start + Duration::from_millis(i * 30)).is_none());
        }
        // 30th frame closes the window at 1.2 s.
        let fps = meter.tick_at(start + Duration::from_millis(1200)).unwrap();
        assert!((fps - 25.0).abs() < 1e-3, "fps = {fps}");
        assert_eq!(meter.frames_in_window(), 0);
        assert_eq!(meter.throughput(), fps);
    }

    #[test]
    fn throughput_is_kept_between_windows() {
        let start = Instant::now();
        let mut meter = RateMeter::new(Duration::from_millis(100));
        meter.reset(start);

        let fps = meter.tick_at(start + Duration::from_millis(200)).unwrap();
        assert!((fps - 5.0).abs() < 1e-3);
        assert!(meter.tick_at(start + Duration::from_millis(210)).is_none());
        assert_eq!(meter.throughput(), fps);
    }
}
