use instant::Duration;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Smoothed frames per second.
#[derive(Debug, Clone)]
pub struct FrameStats {
    smoothed_fps: f32,
    /// Weight of the newest sample.
    smoothing: f32,
    since_report: Duration,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            smoothed_fps: 60.0,
            smoothing: 0.05,
            since_report: Duration::ZERO,
        }
    }

    /// Feeds one frame time. Returns `true` about once a second, when the
    /// smoothed rate is due to be reported.
    pub fn record(&mut self, dt: Duration) -> bool {
        let frame_time = dt.as_secs_f32();
        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            self.smoothed_fps =
                self.smoothed_fps * (1.0 - self.smoothing) + instant_fps * self.smoothing;
        }
        self.since_report += dt;
        if self.since_report >= REPORT_INTERVAL {
            self.since_report = Duration::ZERO;
            true
        } else {
            false
        }
    }

    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}
