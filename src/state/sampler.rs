use std::collections::VecDeque;

use crate::model::TrafficSample;

/// Fixed-length rolling series of aggregate traffic deltas for charting.
///
/// Each `sample` call appends one point whose `up`/`down` are the clamped
/// non-negative deltas against the previous point's cumulative totals (the
/// first point reads 0,0). Points older than the window are dropped and the
/// series is capped at `slots + 1` entries, so the chart can always draw
/// `slots` intervals.
pub struct TrafficSampler {
    window_ms: i64,
    max_len: usize,
    samples: VecDeque<TrafficSample>,
}

impl TrafficSampler {
    /// `slots` chart slots at one sample per `interval_ms`.
    pub fn new(slots: usize, interval_ms: i64) -> Self {
        Self {
            window_ms: slots as i64 * interval_ms,
            max_len: slots + 1,
            samples: VecDeque::with_capacity(slots + 1),
        }
    }

    pub fn sample(&mut self, upload_total: u64, download_total: u64, sessions: usize, now_ms: i64) {
        let (up, down) = match self.samples.back() {
            Some(prev) => (
                upload_total.saturating_sub(prev.total_up),
                download_total.saturating_sub(prev.total_down),
            ),
            None => (0, 0),
        };

        self.samples.push_back(TrafficSample {
            time: now_ms,
            up,
            down,
            total_up: upload_total,
            total_down: download_total,
            sessions,
        });

        let cutoff = now_ms - self.window_ms;
        while self.samples.front().is_some_and(|s| s.time < cutoff) {
            self.samples.pop_front();
        }
        while self.samples.len() > self.max_len {
            self.samples.pop_front();
        }
    }

    /// The series, oldest first.
    pub fn series(&self) -> &VecDeque<TrafficSample> {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_reads_zero() {
        let mut sampler = TrafficSampler::new(60, 1_000);
        sampler.sample(1_000, 2_000, 3, 0);
        let s = sampler.series()[0];
        assert_eq!(s.up, 0);
        assert_eq!(s.down, 0);
        assert_eq!(s.total_up, 1_000);
        assert_eq!(s.sessions, 3);
    }

    #[test]
    fn deltas_against_previous_totals() {
        let mut sampler = TrafficSampler::new(60, 1_000);
        sampler.sample(0, 0, 0, 0);
        sampler.sample(100, 10, 1, 1_000);
        sampler.sample(250, 30, 2, 2_000);
        let ups: Vec<u64> = sampler.series().iter().map(|s| s.up).collect();
        let downs: Vec<u64> = sampler.series().iter().map(|s| s.down).collect();
        assert_eq!(ups, vec![0, 100, 150]);
        assert_eq!(downs, vec![0, 10, 20]);
    }

    #[test]
    fn decreasing_totals_clamp_to_zero() {
        let mut sampler = TrafficSampler::new(60, 1_000);
        sampler.sample(1_000, 1_000, 1, 0);
        sampler.sample(100, 100, 1, 1_000);
        assert_eq!(sampler.series()[1].up, 0);
        assert_eq!(sampler.series()[1].down, 0);
    }

    #[test]
    fn length_never_exceeds_slots_plus_one() {
        let mut sampler = TrafficSampler::new(5, 1_000);
        for i in 0..50u64 {
            sampler.sample(i * 10, i * 20, 1, i as i64 * 1_000);
        }
        assert_eq!(sampler.len(), 6);
    }

    #[test]
    fn stale_samples_fall_out_of_window() {
        let mut sampler = TrafficSampler::new(10, 1_000);
        sampler.sample(0, 0, 0, 0);
        sampler.sample(10, 10, 1, 1_000);
        // A long gap: the first two points are now older than the window.
        sampler.sample(20, 20, 1, 60_000);
        assert_eq!(sampler.len(), 1);
        assert_eq!(sampler.series()[0].time, 60_000);
    }

    #[test]
    fn reset_then_first_sample_is_zero_again() {
        let mut sampler = TrafficSampler::new(10, 1_000);
        sampler.sample(500, 500, 1, 0);
        sampler.sample(600, 600, 1, 1_000);
        sampler.reset();
        assert!(sampler.is_empty());
        sampler.sample(5_000, 5_000, 1, 2_000);
        assert_eq!(sampler.series()[0].up, 0);
    }
}
