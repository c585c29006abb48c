//! Peak capacity tracking.
//!
//! Cheap enough to call on every resize; the device exposes the value through
//! its stats.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct PeakTracker {
    peak_bytes: AtomicUsize,
}

impl PeakTracker {
    pub fn new(initial: usize) -> Self {
        Self {
            peak_bytes: AtomicUsize::new(initial),
        }
    }

    /// Record a new capacity; raises the peak if higher.
    pub fn record(&self, bytes: usize) {
        let prev = self.peak_bytes.fetch_max(bytes, Ordering::AcqRel);
        if bytes > prev {
            #[cfg(feature = "tracing")]
            tracing::trace!(bytes, previous_peak = prev, "new peak buffer capacity");
        }
    }

    pub fn peak(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_only_rises() {
        let t = PeakTracker::new(64);
        t.record(32);
        assert_eq!(t.peak(), 64);
        t.record(128);
        t.record(16);
        assert_eq!(t.peak(), 128);
    }
}
