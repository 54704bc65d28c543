use std::thread;
use std::time::{Duration, Instant};

const WINDOW_MS: u64 = 1000;

// Pad added to every computed wait so a burst cannot land exactly on the
// window boundary and sneak past the quota.
const BOUNDARY_PAD_MS: u64 = 10;

/// Sliding-window pacer for outbound API requests: at most `max_per_second`
/// requests are permitted in any trailing one-second window.
///
/// One instance is shared by the single batch loop; `acquire()` blocks the
/// caller until the next request is allowed and never fails.
pub(crate) struct RequestPacer {
    max_per_second: usize,
    window: Vec<Instant>,
}

impl RequestPacer {
    pub(crate) fn new(max_per_second: u32) -> Self {
        Self {
            max_per_second: max_per_second.max(1) as usize,
            window: Vec::new(),
        }
    }

    /// Blocks until one more request may be issued, then records it.
    pub(crate) fn acquire(&mut self) {
        let now = Instant::now();
        self.window
            .retain(|t| now.duration_since(*t) < Duration::from_millis(WINDOW_MS));

        if self.window.len() >= self.max_per_second {
            // window is in insertion order, so [0] is the oldest survivor
            let elapsed = now.duration_since(self.window[0]).as_millis() as i64;
            let wait = WINDOW_MS as i64 - elapsed + BOUNDARY_PAD_MS as i64;
            if wait > 0 {
                thread::sleep(Duration::from_millis(wait as u64));
            }
        }

        self.window.push(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_under_limit_is_immediate() {
        let mut pacer = RequestPacer::new(3);
        let start = Instant::now();
        pacer.acquire();
        pacer.acquire();
        pacer.acquire();
        assert!(
            start.elapsed() < Duration::from_millis(200),
            "first {} acquires should not sleep, took {:?}",
            3,
            start.elapsed()
        );
    }

    #[test]
    fn test_fourth_acquire_waits_for_window() {
        let mut pacer = RequestPacer::new(3);
        let start = Instant::now();
        for _ in 0..3 {
            pacer.acquire();
        }
        pacer.acquire();
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(950),
            "fourth acquire returned after only {elapsed:?}"
        );
        assert!(elapsed < Duration::from_secs(3), "waited too long: {elapsed:?}");
    }

    #[test]
    fn test_fifth_acquire_rides_the_moved_window() {
        let mut pacer = RequestPacer::new(3);
        let start = Instant::now();
        for _ in 0..5 {
            pacer.acquire();
        }
        let elapsed = start.elapsed();
        // The 4th acquire pays the full window wait; by then the first three
        // timestamps are stale, so the 5th goes through without another one.
        assert!(elapsed >= Duration::from_millis(950));
        assert!(elapsed < Duration::from_secs(3), "waited too long: {elapsed:?}");
    }

    #[test]
    fn test_stale_window_does_not_block() {
        let mut pacer = RequestPacer::new(3);
        for _ in 0..3 {
            pacer.acquire();
        }
        thread::sleep(Duration::from_millis(1100));
        let start = Instant::now();
        pacer.acquire();
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
