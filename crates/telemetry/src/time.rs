// Path: crates/telemetry/src/time.rs
use std::time::Instant;

/// Calls `observe` with the elapsed seconds when dropped.
pub struct Timer<F: FnMut(f64)> {
    observe: F,
    start: Instant,
}

impl<F: FnMut(f64)> Timer<F> {
    /// Starts timing now.
    pub fn new(observe: F) -> Self {
        Self {
            observe,
            start: Instant::now(),
        }
    }
}

impl<F: FnMut(f64)> Drop for Timer<F> {
    fn drop(&mut self) {
        (self.observe)(self.start.elapsed().as_secs_f64());
    }
}
