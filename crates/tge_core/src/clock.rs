use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

/// Per-frame wall clock published to scripts (`Game.time`, `Game.delta_time`,
/// `Game.frame`, `Game.fps`).
pub struct FrameClock {
    pub max_delta: f64,
    pub delta: f64,
    pub total_time: f64,
    pub frame_count: u64,
    last_instant: Instant,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            max_delta: 0.25,
            delta: 0.0,
            total_time: 0.0,
            frame_count: 0,
            last_instant: Instant::now(),
            fps_samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 60.0,
        }
    }

    pub fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed);
    }

    /// Account for `elapsed` seconds of wall time.
    pub fn advance(&mut self, elapsed: f64) {
        let mut dt = elapsed.max(0.0);
        if dt > self.max_delta {
            log::warn!(
                "Frame took {:.1}ms, clamping delta to {}ms",
                dt * 1000.0,
                self.max_delta * 1000.0
            );
            dt = self.max_delta;
        }

        self.delta = dt;
        self.total_time += dt;
        self.frame_count += 1;

        self.fps_samples[self.fps_sample_index] = dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
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

    #[test]
    fn advance_accumulates_time_and_frames() {
        let mut clock = FrameClock::new();
        clock.advance(0.016);
        clock.advance(0.020);
        assert_eq!(clock.frame_count, 2);
        assert!((clock.delta - 0.020).abs() < 1e-12);
        assert!((clock.total_time - 0.036).abs() < 1e-12);
    }

    #[test]
    fn long_frames_are_clamped() {
        let mut clock = FrameClock::new();
        clock.advance(3.0);
        assert!((clock.delta - clock.max_delta).abs() < 1e-12);
        assert!((clock.total_time - clock.max_delta).abs() < 1e-12);
    }

    #[test]
    fn negative_elapsed_counts_as_zero() {
        let mut clock = FrameClock::new();
        clock.advance(-1.0);
        assert_eq!(clock.delta, 0.0);
        assert_eq!(clock.frame_count, 1);
    }

    #[test]
    fn smoothed_fps_converges_to_steady_rate() {
        let mut clock = FrameClock::new();
        for _ in 0..FPS_SAMPLE_COUNT {
            clock.advance(1.0 / 30.0);
        }
        assert!((clock.smoothed_fps - 30.0).abs() < 1e-6);
    }
}
