//! Tick timing.
//!
//! Paces the controlling loop to a target tick rate and tracks recent tick
//! durations.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Maximum samples kept for averaging.
const MAX_SAMPLES: usize = 120;

/// Tick timing manager.
#[derive(Debug)]
pub struct FrameTiming {
    /// Target ticks per second
    target_tps: u32,
    /// Time budget per tick
    tick_budget: Duration,
    /// Time of last tick start
    last_tick: Instant,
    /// Maximum recorded delta, clamps stalls
    max_dt: f32,
    /// Sleep out the remainder of each budget
    pacing: bool,
    /// Recent tick times for averaging
    tick_times: VecDeque<f32>,
    /// Longest tick seen since the last reset
    longest: f32,
}

impl FrameTiming {
    /// Create a new timing manager.
    #[must_use]
    pub fn new(target_tps: u32) -> Self {
        let target_tps = target_tps.max(1);
        Self {
            target_tps,
            tick_budget: Duration::from_secs_f64(1.0 / f64::from(target_tps)),
            last_tick: Instant::now(),
            max_dt: 0.25, // Max 250ms delta
            pacing: true,
            tick_times: VecDeque::with_capacity(MAX_SAMPLES),
            longest: 0.0,
        }
    }

    /// Enable or disable sleeping between ticks.
    #[must_use]
    pub fn with_pacing(mut self, pacing: bool) -> Self {
        self.pacing = pacing;
        self
    }

    /// Calculate delta time since last tick and record it.
    pub fn delta_time(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_tick).as_secs_f32();
        self.last_tick = now;

        self.longest = self.longest.max(dt);
        let clamped_dt = dt.min(self.max_dt);

        self.tick_times.push_back(clamped_dt);
        if self.tick_times.len() > MAX_SAMPLES {
            self.tick_times.pop_front();
        }

        clamped_dt
    }

    /// Sleep for the remainder of the tick budget (if pacing is on).
    pub fn sleep_remainder(&self) {
        if !self.pacing {
            return;
        }

        let elapsed = self.last_tick.elapsed();
        if elapsed < self.tick_budget {
            std::thread::sleep(self.tick_budget - elapsed);
        }
    }

    /// Get the current tick rate (averaged over recent ticks).
    #[must_use]
    pub fn current_tps(&self) -> f32 {
        let avg = self.average_tick_time_ms() / 1000.0;
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    /// Get the average tick time in milliseconds.
    #[must_use]
    pub fn average_tick_time_ms(&self) -> f32 {
        if self.tick_times.is_empty() {
            return 0.0;
        }

        (self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32) * 1000.0
    }

    /// Longest unclamped tick in milliseconds.
    #[must_use]
    pub fn longest_tick_ms(&self) -> f32 {
        self.longest * 1000.0
    }

    /// Get the target tick rate.
    #[must_use]
    pub fn target_tps(&self) -> u32 {
        self.target_tps
    }

    /// Reset timing (call after setup work).
    pub fn reset(&mut self) {
        self.last_tick = Instant::now();
        self.tick_times.clear();
        self.longest = 0.0;
    }
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_timing_creation() {
        let timing = FrameTiming::new(60);
        assert_eq!(timing.target_tps(), 60);
        assert_eq!(FrameTiming::new(0).target_tps(), 1);
    }

    #[test]
    fn test_frame_timing_delta() {
        let mut timing = FrameTiming::new(60);

        std::thread::sleep(Duration::from_millis(16));
        let dt = timing.delta_time();
        assert!(dt >= 0.015); // At least 15ms
        assert!(dt < 0.5);
    }

    #[test]
    fn test_frame_timing_max_dt() {
        let mut timing = FrameTiming::new(60);

        std::thread::sleep(Duration::from_millis(300));
        let dt = timing.delta_time();

        assert!(dt <= timing.max_dt);
        assert!(timing.longest_tick_ms() >= 300.0);
    }

    #[test]
    fn test_pacing_holds_budget() {
        let mut timing = FrameTiming::new(50);
        timing.reset();
        let start = Instant::now();
        timing.sleep_remainder();
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_unpaced_does_not_sleep() {
        let timing = FrameTiming::new(1).with_pacing(false);
        let start = Instant::now();
        timing.sleep_remainder();
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_current_tps_from_samples() {
        let mut timing = FrameTiming::new(60);
        timing.tick_times.extend([0.02, 0.02, 0.02]);
        assert!((timing.current_tps() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_reset_timing() {
        let mut timing = FrameTiming::new(60);
        timing.tick_times.push_back(0.016);
        timing.longest = 1.0;

        timing.reset();

        assert!(timing.tick_times.is_empty());
        assert_eq!(timing.current_tps(), 0.0);
        assert_eq!(timing.longest_tick_ms(), 0.0);
    }
}
