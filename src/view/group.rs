use clap::ValueEnum;
use rustc_hash::FxHashMap;

use crate::model::{ConnectionDetail, ConnectionGroup, ConnMetadata};

/// Grouping axis applied to the flat snapshot before sort/filter/search.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GroupMode {
    /// Render the snapshot's own rows unchanged.
    #[default]
    Current,
    /// Re-bucket every session by its source IP.
    Source,
    /// Re-bucket every session by its destination host (or IP).
    Destination,
}

impl GroupMode {
    pub fn next(self) -> Self {
        match self {
            Self::Current => Self::Source,
            Self::Source => Self::Destination,
            Self::Destination => Self::Current,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Source => "by source",
            Self::Destination => "by destination",
        }
    }
}

const UNKNOWN: &str = "unknown";
const MIXED: &str = "mixed";

/// Three-way label merge for the non-bucketed axis of a synthesized group:
/// `unknown + x = x`, `x + x = x`, `x + y = mixed`. Empty strings count as
/// unknown.
pub fn merge_label(a: &str, b: &str) -> String {
    let a = if a.is_empty() { UNKNOWN } else { a };
    let b = if b.is_empty() { UNKNOWN } else { b };
    if a == UNKNOWN {
        b.to_string()
    } else if b == UNKNOWN || a == b {
        a.to_string()
    } else {
        MIXED.to_string()
    }
}

/// Re-bucket the flat snapshot by the requested axis.
///
/// `Current` is the identity. For `Source`/`Destination` all details are
/// flattened into one pool and re-bucketed by the detail's source IP or
/// destination host/IP; one group is synthesized per bucket with summed
/// bytes, details sorted newest-`last_seen` first, the earliest start, the
/// latest `last_seen`, and merged labels on the other axis. The result is
/// sorted by `last_seen` descending.
///
/// Cost is O(total details) per call; the caller only invokes this while
/// the connections view is actually visible.
pub fn build_view(groups: &[ConnectionGroup], mode: GroupMode) -> Vec<ConnectionGroup> {
    match mode {
        GroupMode::Current => groups.to_vec(),
        GroupMode::Source => rebucket(groups, GroupMode::Source, |d| {
            bucket_key(&d.metadata.source_ip)
        }),
        GroupMode::Destination => rebucket(groups, GroupMode::Destination, |d| {
            bucket_key(d.metadata.destination_label())
        }),
    }
}

fn bucket_key(raw: &str) -> String {
    if raw.is_empty() {
        UNKNOWN.to_string()
    } else {
        raw.to_string()
    }
}

/// The bucketed-axis field carries the bucket key verbatim (so a bucket
/// keyed by a destination IP still displays and sorts as that IP); only the
/// other axis goes through `merge_label`.
fn rebucket<F>(groups: &[ConnectionGroup], axis: GroupMode, key_of: F) -> Vec<ConnectionGroup>
where
    F: Fn(&ConnectionDetail) -> String,
{
    let mut buckets: FxHashMap<String, ConnectionGroup> = FxHashMap::default();
    let mut order: Vec<String> = Vec::new();

    for group in groups {
        for detail in &group.details {
            let key = key_of(detail);
            let entry = buckets.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                let mut metadata = ConnMetadata {
                    source_ip: detail.metadata.source_ip.clone(),
                    host: detail.metadata.host.clone(),
                    destination_ip: detail.metadata.destination_ip.clone(),
                    domain_source: detail.metadata.domain_source.clone(),
                    ..Default::default()
                };
                match axis {
                    GroupMode::Source => metadata.source_ip = key.clone(),
                    GroupMode::Destination => metadata.host = key.clone(),
                    GroupMode::Current => {}
                }
                ConnectionGroup {
                    id: key.clone(),
                    metadata,
                    rule: detail.rule.clone(),
                    ..Default::default()
                }
            });

            match axis {
                GroupMode::Source => {
                    entry.metadata.host =
                        merge_label(&entry.metadata.host, &detail.metadata.host);
                    entry.metadata.destination_ip = merge_label(
                        &entry.metadata.destination_ip,
                        &detail.metadata.destination_ip,
                    );
                }
                GroupMode::Destination => {
                    entry.metadata.source_ip =
                        merge_label(&entry.metadata.source_ip, &detail.metadata.source_ip);
                }
                GroupMode::Current => {}
            }
            entry.metadata.domain_source =
                merge_label(&entry.metadata.domain_source, &detail.metadata.domain_source);
            entry.rule = match (&entry.rule, &detail.rule) {
                (Some(a), Some(b)) => Some(merge_label(a, b)),
                (Some(a), None) => Some(a.clone()),
                (None, other) => other.clone(),
            };

            entry.upload += detail.upload;
            entry.download += detail.download;
            entry.start = match (entry.start, detail.start) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            entry.last_seen = match (entry.last_seen, detail.last_seen) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
            entry.details.push(detail.clone());
        }
    }

    let mut out: Vec<ConnectionGroup> = order
        .into_iter()
        .filter_map(|key| buckets.remove(&key))
        .map(|mut g| {
            g.details
                .sort_by(|a, b| b.last_seen_ms().cmp(&a.last_seen_ms()));
            g.connection_count = g.details.len() as u32;
            g
        })
        .collect();

    out.sort_by(|a, b| b.last_seen_ms().cmp(&a.last_seen_ms()));
    out
}
