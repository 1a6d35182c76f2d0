//! Atomic helpers for device statistics.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// A monotonically increasing event counter.
#[derive(Debug)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create a new counter.
    pub const fn new(initial: u64) -> Self {
        Self(AtomicU64::new(initial))
    }

    /// Increment the counter.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Add a byte count or event count.
    pub fn add(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    /// Get the current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

/// A gauge for live device bytes, with a separate high-water mark.
#[derive(Debug, Default)]
pub struct AtomicGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl AtomicGauge {
    /// Create an empty gauge.
    pub const fn new() -> Self {
        Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Add to the gauge and raise the peak if needed. Returns the new value.
    pub fn add(&self, value: usize) -> usize {
        let now = self.current.fetch_add(value, Ordering::Relaxed) + value;
        self.peak.fetch_max(now, Ordering::Relaxed);
        now
    }

    /// Subtract from the gauge, saturating at zero. Returns the new value.
    pub fn sub(&self, value: usize) -> usize {
        let mut current = self.current.load(Ordering::Relaxed);
        loop {
            let next = current.saturating_sub(value);
            match self.current.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }

    /// Current value.
    pub fn get(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// High-water mark.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_tracks_peak() {
        let gauge = AtomicGauge::new();
        assert_eq!(gauge.add(100), 100);
        assert_eq!(gauge.add(50), 150);
        assert_eq!(gauge.sub(120), 30);
        assert_eq!(gauge.get(), 30);
        assert_eq!(gauge.peak(), 150);
    }

    #[test]
    fn test_gauge_sub_saturates() {
        let gauge = AtomicGauge::new();
        gauge.add(10);
        assert_eq!(gauge.sub(64), 0);
    }

    #[test]
    fn test_counter() {
        let counter = AtomicCounter::default();
        counter.increment();
        counter.add(4096);
        assert_eq!(counter.get(), 4097);
    }
}
