use instant::{Duration, Instant};

/// Monotonic scene time, started on construction and never reset.
#[derive(Debug, Clone, Copy)]
pub struct SceneClock {
    started: Instant,
}

impl SceneClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed().as_secs_f32()
    }
}

impl Default for SceneClock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_never_decreases() {
        let clock = SceneClock::start();
        let first = clock.elapsed();
        let second = clock.elapsed();
        assert!(second >= first);
        assert!(clock.elapsed_secs() >= 0.0);
    }
}
