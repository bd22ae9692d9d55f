//! Accumulating wall-clock stopwatch with a search budget.

use std::time::{Duration, Instant};

/// A pausable stopwatch. `elapsed` and `bound_broken` take `&self`, so a
/// running stopwatch can be polled from worker threads while the owner
/// keeps it started.
#[derive(Debug)]
pub struct Stopwatch {
    started_at: Option<Instant>,
    accumulated: Duration,
    bound: Duration,
}

impl Stopwatch {
    /// Default search budget in seconds.
    pub const DEFAULT_BOUND_SECS: u64 = 1200;

    pub fn new() -> Self {
        Stopwatch {
            started_at: None,
            accumulated: Duration::ZERO,
            bound: Duration::from_secs(Self::DEFAULT_BOUND_SECS),
        }
    }

    pub fn with_bound_secs(secs: u64) -> Self {
        let mut sw = Stopwatch::new();
        sw.set_bound_secs(secs);
        sw
    }

    pub fn set_bound_secs(&mut self, secs: u64) {
        self.bound = Duration::from_secs(secs);
    }

    pub fn bound_secs(&self) -> u64 {
        self.bound.as_secs()
    }

    /// Starts (or resumes) the stopwatch. Starting a running stopwatch is
    /// a no-op.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Pauses the stopwatch, folding the running span into the total.
    pub fn stop(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.accumulated += started.elapsed();
        }
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }

    /// Total elapsed time in seconds, including the running span.
    pub fn elapsed(&self) -> f64 {
        let mut total = self.accumulated;
        if let Some(started) = self.started_at {
            total += started.elapsed();
        }
        total.as_secs_f64()
    }

    /// True once the elapsed time exceeds the budget.
    pub fn bound_broken(&self) -> bool {
        self.elapsed() > self.bound.as_secs_f64()
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Stopwatch::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_unstarted_is_zero() {
        let sw = Stopwatch::new();
        assert_eq!(sw.elapsed(), 0.0);
        assert!(!sw.bound_broken());
    }

    #[test]
    fn test_bound_broken() {
        let mut sw = Stopwatch::with_bound_secs(0);
        sw.start();
        sleep(std::time::Duration::from_millis(5));
        assert!(sw.bound_broken());
    }

    #[test]
    fn test_stop_pauses() {
        let mut sw = Stopwatch::new();
        sw.start();
        sleep(std::time::Duration::from_millis(2));
        sw.stop();
        let frozen = sw.elapsed();
        sleep(std::time::Duration::from_millis(5));
        assert_eq!(sw.elapsed(), frozen);
    }

    #[test]
    fn test_reset() {
        let mut sw = Stopwatch::new();
        sw.start();
        sleep(std::time::Duration::from_millis(2));
        sw.reset();
        assert_eq!(sw.elapsed(), 0.0);
    }
}
