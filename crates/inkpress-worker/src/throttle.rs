//! Progress write throttling.
//!
//! Fast jobs can produce dozens of progress callbacks per second; flushing
//! every one to the database is pure write amplification. The throttler lets
//! a flush through only when the job finishes, enough pages have accumulated,
//! or enough wall time has passed.

use std::time::Instant;

use inkpress_core::defaults::{PROGRESS_MIN_INTERVAL_SECS, PROGRESS_MIN_STEP};

/// Decides which progress updates are worth persisting.
#[derive(Debug)]
pub struct ProgressThrottler {
    last_flush: Option<Instant>,
    last_done: i32,
}

impl ProgressThrottler {
    pub fn new() -> Self {
        Self {
            last_flush: None,
            last_done: 0,
        }
    }

    /// Whether `(done, total)` should be flushed now. Records the flush when
    /// it returns `true`.
    pub fn should_flush(&mut self, done: i32, total: i32) -> bool {
        if self.decide(done, total) {
            self.last_flush = Some(Instant::now());
            self.last_done = done;
            true
        } else {
            false
        }
    }

    fn decide(&self, done: i32, total: i32) -> bool {
        // Final update always lands.
        if done >= total {
            return true;
        }
        let Some(last) = self.last_flush else {
            // First update establishes the total in the job row.
            return true;
        };
        if done - self.last_done >= PROGRESS_MIN_STEP {
            return true;
        }
        last.elapsed().as_secs_f64() >= PROGRESS_MIN_INTERVAL_SECS
    }
}

impl Default for ProgressThrottler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_update_always_flushes() {
        let mut t = ProgressThrottler::new();
        assert!(t.should_flush(0, 40));
    }

    #[test]
    fn test_small_advance_is_suppressed() {
        let mut t = ProgressThrottler::new();
        assert!(t.should_flush(0, 40));
        assert!(!t.should_flush(1, 40));
        assert!(!t.should_flush(2, 40));
    }

    #[test]
    fn test_step_advance_flushes() {
        let mut t = ProgressThrottler::new();
        assert!(t.should_flush(0, 40));
        assert!(t.should_flush(PROGRESS_MIN_STEP, 40));
    }

    #[test]
    fn test_completion_always_flushes() {
        let mut t = ProgressThrottler::new();
        assert!(t.should_flush(0, 40));
        assert!(t.should_flush(1, 40) == false);
        assert!(t.should_flush(40, 40));
        // Overshoot still counts as completion.
        assert!(t.should_flush(41, 40));
    }

    #[test]
    fn test_elapsed_time_flushes() {
        let mut t = ProgressThrottler::new();
        assert!(t.should_flush(0, 40));
        t.last_flush = Some(
            Instant::now() - Duration::from_secs_f64(PROGRESS_MIN_INTERVAL_SECS + 0.1),
        );
        assert!(t.should_flush(1, 40));
    }

    #[test]
    fn test_flush_resets_counters() {
        let mut t = ProgressThrottler::new();
        assert!(t.should_flush(0, 40));
        assert!(t.should_flush(3, 40));
        // Advance measured from the last flush, not the start.
        assert!(!t.should_flush(4, 40));
        assert!(!t.should_flush(5, 40));
        assert!(t.should_flush(6, 40));
    }
}
