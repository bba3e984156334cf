// src/clock.rs - Session time base for motion sampling and rate control
use tokio::time::Instant;

/// Monotonic elapsed-time source with an explicit reset.
///
/// Built on `tokio::time::Instant`, so a runtime started with paused time
/// (`#[tokio::test(start_paused = true)]`) drives it deterministically.
#[derive(Debug, Clone)]
pub struct Clock {
    origin: Instant,
    time: f64,
}

impl Clock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            time: 0.0,
        }
    }

    /// Zero the elapsed time and record a new origin.
    pub fn reset(&mut self) {
        self.origin = Instant::now();
        self.time = 0.0;
    }

    /// Refresh the cached elapsed time from the time source and return it.
    pub fn update(&mut self) -> f64 {
        self.time = self.origin.elapsed().as_secs_f64();
        self.time
    }

    /// Seconds since the last reset, as of the last `update`.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Seconds since the last reset, read fresh.
    pub fn elapsed(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
