//! Frame timing.
//!
//! The engine makes no scheduling decisions; it only bounds the delta it is
//! given. [`clamp_delta`] turns a raw wall-clock delta into the step size
//! used by the passes, and [`FrameClock`] measures raw deltas for callers that
//! drive the loop themselves.
//!
//! # Example
//!
//! ```ignore
//! let mut clock = FrameClock::new();
//! loop {
//!     let input = FrameInput { delta: clock.tick(), ..FrameInput::new() };
//!     sim.step(&input)?;
//! }
//! ```

use std::time::{Duration, Instant};

/// Step size when no elapsed time is known (first frame).
pub const NOMINAL_DELTA: f32 = 1.0 / 60.0;

/// Largest step size: the simulation never advances slower than 20 updates/sec.
pub const MAX_DELTA: f32 = 1.0 / 20.0;

/// Bound a raw frame delta.
///
/// `None` and non-finite values yield [`NOMINAL_DELTA`]; negative values
/// yield zero; large values are capped at [`MAX_DELTA`].
#[inline]
pub fn clamp_delta(raw: Option<f32>) -> f32 {
    match raw {
        Some(dt) if dt.is_finite() => dt.clamp(0.0, MAX_DELTA),
        _ => NOMINAL_DELTA,
    }
}

/// Wall-clock frame timer.
#[derive(Debug)]
pub struct FrameClock {
    /// When the clock was created.
    start: Instant,
    /// When the last frame occurred.
    last_frame: Option<Instant>,
    /// Total frames ticked.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    /// Frame count at last FPS update.
    fps_frame_count: u64,
    /// Time of last FPS calculation.
    fps_update_time: Instant,
    /// How often to update FPS calculation.
    fps_update_interval: Duration,
}

impl FrameClock {
    /// Create a new clock starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: None,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
        }
    }

    /// Mark a new frame and return the raw seconds since the previous one.
    ///
    /// Returns `None` on the first call.
    pub fn tick(&mut self) -> Option<f32> {
        let now = Instant::now();
        let delta = self
            .last_frame
            .map(|last| now.duration_since(last).as_secs_f32());
        self.last_frame = Some(now);
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        delta
    }

    /// Seconds since the clock was created.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    /// Frames ticked so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Calculated frames per second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Set how often FPS is recalculated.
    pub fn set_fps_update_interval(&mut self, interval: Duration) {
        self.fps_update_interval = interval;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    // ========== clamp_delta Tests ==========

    #[test]
    fn test_first_frame_uses_nominal() {
        assert_eq!(clamp_delta(None), NOMINAL_DELTA);
    }

    #[test]
    fn test_stall_is_capped() {
        assert_eq!(clamp_delta(Some(2.0)), MAX_DELTA);
        assert_eq!(clamp_delta(Some(1.0 / 20.0)), MAX_DELTA);
    }

    #[test]
    fn test_small_delta_passes_through() {
        assert_eq!(clamp_delta(Some(0.01)), 0.01);
    }

    #[test]
    fn test_bad_delta() {
        assert_eq!(clamp_delta(Some(-1.0)), 0.0);
        assert_eq!(clamp_delta(Some(f32::NAN)), NOMINAL_DELTA);
        assert_eq!(clamp_delta(Some(f32::INFINITY)), NOMINAL_DELTA);
    }

    // ========== FrameClock Tests ==========

    #[test]
    fn test_clock_first_tick_is_none() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(), None);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_clock_measures_delta() {
        let mut clock = FrameClock::new();
        clock.tick();
        thread::sleep(Duration::from_millis(10));
        let delta = clock.tick().unwrap();
        assert!(delta >= 0.009, "delta = {}", delta);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn test_clock_fps() {
        let mut clock = FrameClock::new();
        clock.set_fps_update_interval(Duration::from_millis(1));
        clock.tick();
        thread::sleep(Duration::from_millis(5));
        clock.tick();
        assert!(clock.fps() > 0.0);
    }
}
