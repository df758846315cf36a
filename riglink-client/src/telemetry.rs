//! Bitrate accounting
//!
//! Counts wire bytes per direction and converts them to a bits-per-second
//! figure once per telemetry window. Recording happens on the session's
//! network paths while reading happens on the telemetry tick, so the counter
//! is shared behind an `Arc` and uses atomics instead of a lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

// =============================================================================
// Bitrate Counter
// =============================================================================

/// Byte counter for one traffic direction
///
/// `record` accumulates into the current window; `roll_window` closes the
/// window and publishes its rate. Readers always see the rate of the last
/// completed window, never a partial one.
#[derive(Debug, Default)]
pub struct BitrateCounter {
    /// Bytes accumulated in the current window
    window_bytes: AtomicU64,
    /// Rate of the last completed window in bits per second
    last_bps: AtomicU64,
}

impl BitrateCounter {
    /// Create a counter with an empty window
    pub fn new() -> Self {
        Self::default()
    }

    /// Add wire bytes to the current window
    pub fn record(&self, byte_count: usize) {
        self.window_bytes
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    /// Close the current window and publish its rate
    ///
    /// # Arguments
    /// * `elapsed` - Wall time the window actually covered
    pub fn roll_window(&self, elapsed: Duration) {
        let bytes = self.window_bytes.swap(0, Ordering::Relaxed);
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return;
        }
        let bps = (bytes as f64 * 8.0 / secs).round() as u64;
        self.last_bps.store(bps, Ordering::Relaxed);
    }

    /// Rate of the last completed window in bits per second
    pub fn rate_bps(&self) -> u64 {
        self.last_bps.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_new_counter_reads_zero() {
        let counter = BitrateCounter::new();
        assert_eq!(counter.rate_bps(), 0);
    }

    #[test]
    fn test_recorded_bytes_become_bits_per_second() {
        let counter = BitrateCounter::new();
        counter.record(2000);
        counter.record(2000);
        counter.roll_window(Duration::from_secs(1));
        assert_eq!(counter.rate_bps(), 32_000);
    }

    #[test]
    fn test_rate_scales_with_window_length() {
        let counter = BitrateCounter::new();
        counter.record(1000);
        counter.roll_window(Duration::from_millis(500));
        assert_eq!(counter.rate_bps(), 16_000);
    }

    #[test]
    fn test_roll_resets_the_window() {
        let counter = BitrateCounter::new();
        counter.record(4000);
        counter.roll_window(Duration::from_secs(1));
        assert_eq!(counter.rate_bps(), 32_000);

        // Nothing recorded in the second window
        counter.roll_window(Duration::from_secs(1));
        assert_eq!(counter.rate_bps(), 0);
    }

    #[test]
    fn test_zero_elapsed_keeps_previous_rate() {
        let counter = BitrateCounter::new();
        counter.record(1000);
        counter.roll_window(Duration::from_secs(1));
        let before = counter.rate_bps();

        counter.record(9999);
        counter.roll_window(Duration::ZERO);
        assert_eq!(counter.rate_bps(), before);
    }

    #[test]
    fn test_record_from_multiple_threads() {
        let counter = Arc::new(BitrateCounter::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        counter.record(10);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread should finish");
        }

        counter.roll_window(Duration::from_secs(1));
        assert_eq!(counter.rate_bps(), 80_000);
    }
}
