pub mod closed;
pub mod rates;
pub mod sampler;

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{
    ClosedConnectionRecord, ConnectionSnapshot, RateSample, StreamStatus, TrafficSample,
};

use self::closed::ClosedTracker;
use self::rates::RateEstimator;
use self::sampler::TrafficSampler;

/// Everything the console needs to draw one frame, derived from one accepted
/// snapshot. Published wholesale; readers never see a partial update.
#[derive(Clone)]
pub struct MonitorState {
    /// Monotonic publication counter. The renderer skips a redraw when it
    /// has already drawn this sequence number.
    pub seq: u64,
    pub status: StreamStatus,
    /// The unpruned live snapshot (the connections page renders this; the
    /// dashboard prunes its own copy to the rolling window).
    pub snapshot: ConnectionSnapshot,
    /// Group id -> instantaneous rate.
    pub group_rates: FxHashMap<String, RateSample>,
    /// Detail id -> instantaneous rate, for details of expanded groups only.
    pub detail_rates: FxHashMap<String, RateSample>,
    /// Closed-connection ledger, newest first.
    pub closed: Vec<ClosedConnectionRecord>,
    /// Rolling chart series, oldest first.
    pub traffic: Vec<TrafficSample>,
    /// Unix milliseconds at which the snapshot was processed.
    pub received_at_ms: i64,
}

impl MonitorState {
    pub fn empty() -> Self {
        Self {
            seq: 0,
            status: StreamStatus::Connecting,
            snapshot: ConnectionSnapshot::default(),
            group_rates: FxHashMap::default(),
            detail_rates: FxHashMap::default(),
            closed: Vec::new(),
            traffic: Vec::new(),
            received_at_ms: 0,
        }
    }
}

/// Single-slot, last-value-wins cell between the aggregator and the
/// renderer. Intermediate states may be skipped by a slow reader; closures
/// and rates never are, because they are computed before publication.
pub type SharedMonitor = Arc<ArcSwap<MonitorState>>;

pub fn new_shared_monitor() -> SharedMonitor {
    Arc::new(ArcSwap::from_pointee(MonitorState::empty()))
}

/// Set of expanded group ids, published by the renderer so the aggregator
/// only pays for detail-level rate estimation where details are visible.
pub type DetailScope = Arc<ArcSwap<FxHashSet<String>>>;

pub fn new_detail_scope() -> DetailScope {
    Arc::new(ArcSwap::from_pointee(FxHashSet::default()))
}

/// Owns every ambient map of the pipeline (prior totals, closed ledger,
/// chart series) behind one reset boundary.
///
/// `ingest` runs once per accepted snapshot, in arrival order, regardless of
/// how the renderer coalesces frames.
pub struct Aggregator {
    group_rates: RateEstimator,
    detail_rates: RateEstimator,
    closed: ClosedTracker,
    sampler: TrafficSampler,
    detail_scope: DetailScope,
    seq: u64,
}

impl Aggregator {
    pub fn new(chart_slots: usize, interval_ms: i64, detail_scope: DetailScope) -> Self {
        Self {
            group_rates: RateEstimator::new(),
            detail_rates: RateEstimator::new(),
            closed: ClosedTracker::default(),
            sampler: TrafficSampler::new(chart_slots, interval_ms),
            detail_scope,
            seq: 0,
        }
    }

    /// Process one accepted snapshot and build the state to publish.
    pub fn ingest(
        &mut self,
        snapshot: ConnectionSnapshot,
        status: StreamStatus,
        now_ms: i64,
    ) -> MonitorState {
        // Closure diffing first, against the snapshot as received.
        self.closed.observe(&snapshot, now_ms);

        // Group-level rates, then prune entries for vanished groups.
        let mut group_rates = FxHashMap::default();
        let mut live_groups = FxHashSet::default();
        for group in &snapshot.groups {
            let rate = self
                .group_rates
                .estimate(&group.id, group.upload, group.download, now_ms);
            group_rates.insert(group.id.clone(), rate);
            live_groups.insert(group.id.clone());
        }
        self.group_rates.retain_live(&live_groups);

        // Detail-level rates only inside the expanded scope.
        let scope = self.detail_scope.load();
        let mut detail_rates = FxHashMap::default();
        let mut live_details = FxHashSet::default();
        for group in &snapshot.groups {
            if !scope.contains(&group.id) {
                continue;
            }
            for detail in &group.details {
                let rate =
                    self.detail_rates
                        .estimate(&detail.id, detail.upload, detail.download, now_ms);
                detail_rates.insert(detail.id.clone(), rate);
                live_details.insert(detail.id.clone());
            }
        }
        self.detail_rates.retain_live(&live_details);

        self.sampler.sample(
            snapshot.upload_total,
            snapshot.download_total,
            snapshot.session_count(),
            now_ms,
        );

        self.seq += 1;
        MonitorState {
            seq: self.seq,
            status,
            group_rates,
            detail_rates,
            closed: self.closed.records().iter().cloned().collect(),
            traffic: self.sampler.series().iter().copied().collect(),
            received_at_ms: now_ms,
            snapshot,
        }
    }

    /// Whether the detail estimator currently tracks `id` (test hook and
    /// debugging aid).
    pub fn tracks_detail(&self, id: &str) -> bool {
        self.detail_rates.is_tracking(id)
    }

    pub fn tracks_group(&self, id: &str) -> bool {
        self.group_rates.is_tracking(id)
    }

    /// Reset boundary: forget all prior totals, the ledger, and the chart.
    /// Used when the endpoint or access key changes and session ids lose
    /// meaning.
    pub fn reset(&mut self) {
        self.group_rates.reset();
        self.detail_rates.reset();
        self.closed.reset();
        self.sampler.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnectionDetail, ConnectionGroup};

    fn scope_of(ids: &[&str]) -> DetailScope {
        let scope = new_detail_scope();
        scope.store(Arc::new(ids.iter().map(|s| s.to_string()).collect()));
        scope
    }

    fn snap(groups: &[(&str, u64, u64, &[(&str, u64, u64)])]) -> ConnectionSnapshot {
        ConnectionSnapshot {
            upload_total: groups.iter().map(|(_, u, _, _)| u).sum(),
            download_total: groups.iter().map(|(_, _, d, _)| d).sum(),
            groups: groups
                .iter()
                .map(|(id, up, down, details)| ConnectionGroup {
                    id: id.to_string(),
                    upload: *up,
                    download: *down,
                    connection_count: details.len().max(1) as u32,
                    details: details
                        .iter()
                        .map(|(did, du, dd)| ConnectionDetail {
                            id: did.to_string(),
                            upload: *du,
                            download: *dd,
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[test]
    fn publishes_monotonic_sequence() {
        let mut agg = Aggregator::new(60, 1_000, new_detail_scope());
        let s1 = agg.ingest(snap(&[]), StreamStatus::Live, 1_000);
        let s2 = agg.ingest(snap(&[]), StreamStatus::Live, 2_000);
        assert!(s2.seq > s1.seq);
    }

    #[test]
    fn group_rates_follow_counters() {
        let mut agg = Aggregator::new(60, 1_000, new_detail_scope());
        agg.ingest(snap(&[("g1", 1_000, 500, &[("d1", 1_000, 500)])]), StreamStatus::Live, 0);
        let state = agg.ingest(
            snap(&[("g1", 1_500, 900, &[("d1", 1_500, 900)])]),
            StreamStatus::Live,
            1_000,
        );
        let rate = state.group_rates["g1"];
        assert_eq!(rate.upload, 500.0);
        assert_eq!(rate.download, 400.0);
    }

    #[test]
    fn detail_rates_restricted_to_scope() {
        let mut agg = Aggregator::new(60, 1_000, scope_of(&["g1"]));
        let groups: &[(&str, u64, u64, &[(&str, u64, u64)])] = &[
            ("g1", 0, 0, &[("d1", 0, 0)]),
            ("g2", 0, 0, &[("d2", 0, 0)]),
        ];
        let state = agg.ingest(snap(groups), StreamStatus::Live, 0);
        assert!(state.detail_rates.contains_key("d1"));
        assert!(!state.detail_rates.contains_key("d2"));
        assert!(agg.tracks_detail("d1"));
        assert!(!agg.tracks_detail("d2"));
    }

    #[test]
    fn vanished_detail_closes_and_stops_tracking() {
        let mut agg = Aggregator::new(60, 1_000, scope_of(&["g1"]));
        agg.ingest(snap(&[("g1", 10, 10, &[("d1", 10, 10)])]), StreamStatus::Live, 1_000);
        let state = agg.ingest(snap(&[("g1", 0, 0, &[])]), StreamStatus::Live, 2_000);
        assert_eq!(state.closed.len(), 1);
        assert_eq!(state.closed[0].group.id, "d1");
        assert_eq!(state.closed[0].closed_at, 2_000);
        assert!(!agg.tracks_detail("d1"));
    }

    #[test]
    fn vanished_group_rate_state_dropped() {
        let mut agg = Aggregator::new(60, 1_000, new_detail_scope());
        agg.ingest(snap(&[("g1", 10, 10, &[("d1", 10, 10)])]), StreamStatus::Live, 1_000);
        agg.ingest(snap(&[]), StreamStatus::Live, 2_000);
        assert!(!agg.tracks_group("g1"));
    }

    #[test]
    fn traffic_series_follows_totals() {
        let mut agg = Aggregator::new(60, 1_000, new_detail_scope());
        agg.ingest(snap(&[("g1", 0, 0, &[("d1", 0, 0)])]), StreamStatus::Live, 0);
        agg.ingest(snap(&[("g1", 100, 0, &[("d1", 100, 0)])]), StreamStatus::Live, 1_000);
        let state = agg.ingest(
            snap(&[("g1", 250, 0, &[("d1", 250, 0)])]),
            StreamStatus::Live,
            2_000,
        );
        let ups: Vec<u64> = state.traffic.iter().map(|s| s.up).collect();
        assert_eq!(ups, vec![0, 100, 150]);
    }

    #[test]
    fn shared_monitor_is_last_value_wins() {
        let shared = new_shared_monitor();
        let mut agg = Aggregator::new(60, 1_000, new_detail_scope());
        // A burst of three snapshots between two frames: only the latest is
        // visible to the reader, but every closure was still diffed.
        shared.store(Arc::new(agg.ingest(
            snap(&[("g1", 1, 1, &[("d1", 1, 1)])]),
            StreamStatus::Live,
            1_000,
        )));
        shared.store(Arc::new(agg.ingest(snap(&[]), StreamStatus::Live, 2_000)));
        shared.store(Arc::new(agg.ingest(snap(&[]), StreamStatus::Live, 3_000)));

        let latest = shared.load();
        assert_eq!(latest.seq, 3);
        // The closure from the overwritten middle snapshot survived.
        assert_eq!(latest.closed.len(), 1);
        assert_eq!(latest.closed[0].closed_at, 2_000);
    }
}
