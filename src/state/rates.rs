use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::RateSample;

/// Previous cumulative totals for one entity, with the time they were seen.
#[derive(Clone, Copy, Debug)]
struct PrevTotals {
    upload: u64,
    download: u64,
    time_ms: i64,
}

/// Derives instantaneous byte/s rates by finite differencing of cumulative
/// counters across ticks.
///
/// Stateful per entity id. The first observation of an id yields rate 0;
/// afterwards `rate = max(0, current - previous) / elapsed_seconds`, with
/// zero (or negative) elapsed time also yielding 0, so a repeated call at
/// the same timestamp is idempotent. Counters that go backwards (server-side
/// reset) clamp to 0 rather than producing a negative rate.
///
/// Two independent instances exist at runtime: one keyed by group id for
/// every tick, one keyed by detail id restricted to expanded groups so cost
/// stays bounded under detail fan-out.
#[derive(Default)]
pub struct RateEstimator {
    prev: FxHashMap<String, PrevTotals>,
}

impl RateEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the current cumulative totals for `id` and return its
    /// instantaneous rate.
    pub fn estimate(&mut self, id: &str, upload: u64, download: u64, now_ms: i64) -> RateSample {
        let sample = match self.prev.get(id) {
            Some(prev) => {
                let elapsed = (now_ms - prev.time_ms) as f64 / 1_000.0;
                if elapsed <= 0.0 {
                    RateSample::default()
                } else {
                    RateSample {
                        upload: upload.saturating_sub(prev.upload) as f64 / elapsed,
                        download: download.saturating_sub(prev.download) as f64 / elapsed,
                    }
                }
            }
            None => RateSample::default(),
        };

        self.prev.insert(
            id.to_string(),
            PrevTotals {
                upload,
                download,
                time_ms: now_ms,
            },
        );
        sample
    }

    /// Drop state for every id absent from the latest tick.
    pub fn retain_live(&mut self, live: &FxHashSet<String>) {
        self.prev.retain(|id, _| live.contains(id));
    }

    /// Whether any prior totals are stored for `id`.
    pub fn is_tracking(&self, id: &str) -> bool {
        self.prev.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.prev.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prev.is_empty()
    }

    /// Clear all stored totals, e.g. when the subscription is recreated.
    pub fn reset(&mut self) {
        self.prev.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(ids: &[&str]) -> FxHashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_observation_is_zero() {
        let mut est = RateEstimator::new();
        let r = est.estimate("d1", 1_000, 500, 10_000);
        assert_eq!(r, RateSample::default());
        assert!(est.is_tracking("d1"));
    }

    #[test]
    fn delta_over_one_second() {
        let mut est = RateEstimator::new();
        est.estimate("d1", 1_000, 500, 10_000);
        let r = est.estimate("d1", 1_500, 900, 11_000);
        assert_eq!(r.upload, 500.0);
        assert_eq!(r.download, 400.0);
    }

    #[test]
    fn delta_over_half_second() {
        let mut est = RateEstimator::new();
        est.estimate("d1", 0, 0, 0);
        let r = est.estimate("d1", 100, 50, 500);
        assert_eq!(r.upload, 200.0);
        assert_eq!(r.download, 100.0);
    }

    #[test]
    fn zero_elapsed_is_idempotent_zero() {
        let mut est = RateEstimator::new();
        est.estimate("d1", 1_000, 500, 10_000);
        let r = est.estimate("d1", 2_000, 900, 10_000);
        assert_eq!(r, RateSample::default());
        // And again, still zero at the same timestamp.
        let r = est.estimate("d1", 3_000, 900, 10_000);
        assert_eq!(r, RateSample::default());
    }

    #[test]
    fn negative_elapsed_is_zero() {
        let mut est = RateEstimator::new();
        est.estimate("d1", 1_000, 500, 10_000);
        let r = est.estimate("d1", 2_000, 900, 9_000);
        assert_eq!(r, RateSample::default());
    }

    #[test]
    fn decreasing_counter_clamps_to_zero() {
        let mut est = RateEstimator::new();
        est.estimate("d1", 1_000, 500, 10_000);
        let r = est.estimate("d1", 200, 100, 11_000);
        assert_eq!(r.upload, 0.0);
        assert_eq!(r.download, 0.0);
    }

    #[test]
    fn retain_live_drops_vanished_ids() {
        let mut est = RateEstimator::new();
        est.estimate("d1", 10, 10, 1_000);
        est.estimate("d2", 20, 20, 1_000);
        est.retain_live(&live(&["d2"]));
        assert!(!est.is_tracking("d1"));
        assert!(est.is_tracking("d2"));
        assert_eq!(est.len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut est = RateEstimator::new();
        est.estimate("d1", 10, 10, 1_000);
        est.reset();
        assert!(est.is_empty());
        // After reset the next observation is a first observation again.
        let r = est.estimate("d1", 1_000_000, 1_000_000, 2_000);
        assert_eq!(r, RateSample::default());
    }
}
