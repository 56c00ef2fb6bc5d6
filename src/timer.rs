// Frame timing
//
// `StepTimer` reports uptime and per-frame delta; `FpsCounter` turns frame
// counts into a frames-per-second figure refreshed twice a second.

use std::time::{Duration, Instant};

/// How often the FPS figure is recomputed
pub const FPS_UPDATE_INTERVAL_SEC: f64 = 0.5;

/// Uptime and elapsed time since the previous tick
pub struct StepTimer {
    start: Instant,
    last: Instant,
}

impl StepTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { start: now, last: now }
    }

    /// Advance to now and return `(uptime_sec, elapsed_sec)`
    pub fn tick(&mut self) -> (f64, f64) {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> (f64, f64) {
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        (
            now.saturating_duration_since(self.start).as_secs_f64(),
            elapsed.as_secs_f64(),
        )
    }

    pub fn uptime(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FpsCounter {
    frames: u32,
    last_update_sec: f64,
    frames_per_sec: f32,
}

impl FpsCounter {
    /// Count one frame at `uptime_sec`. Returns the new figure when it was refreshed.
    pub fn tick(&mut self, uptime_sec: f64) -> Option<f32> {
        self.frames += 1;

        let interval = uptime_sec - self.last_update_sec;
        if interval < FPS_UPDATE_INTERVAL_SEC {
            return None;
        }

        self.frames_per_sec = (self.frames as f64 / interval) as f32;
        self.last_update_sec = uptime_sec;
        self.frames = 0;
        Some(self.frames_per_sec)
    }

    pub fn frames_per_sec(&self) -> f32 {
        self.frames_per_sec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_only_refreshes_after_half_a_second() {
        let mut fps = FpsCounter::default();
        assert_eq!(fps.tick(0.1), None);
        assert_eq!(fps.tick(0.2), None);
        assert_eq!(fps.tick(0.4), None);
        // 4 frames over 0.5 s
        let value = fps.tick(0.5).unwrap();
        assert!((value - 8.0).abs() < 1e-4);
        assert_eq!(fps.frames_per_sec(), value);
    }

    #[test]
    fn fps_window_restarts_after_refresh() {
        let mut fps = FpsCounter::default();
        fps.tick(0.5);
        assert_eq!(fps.tick(0.7), None);
        let value = fps.tick(1.0).unwrap();
        assert!((value - 4.0).abs() < 1e-4);
    }

    #[test]
    fn step_timer_reports_delta_between_ticks() {
        let mut timer = StepTimer::new();
        let start = timer.start;
        let (uptime, elapsed) = timer.tick_at(start + Duration::from_millis(250));
        assert!((uptime - 0.25).abs() < 1e-9);
        assert!((elapsed - 0.25).abs() < 1e-9);

        let (uptime, elapsed) = timer.tick_at(start + Duration::from_millis(400));
        assert!((uptime - 0.4).abs() < 1e-9);
        assert!((elapsed - 0.15).abs() < 1e-9);
    }
}
