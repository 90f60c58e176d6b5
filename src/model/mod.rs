pub mod normalize;
pub mod prune;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One complete point-in-time listing of everything the proxy core is
/// carrying. Replaces the previous snapshot wholesale on every push tick.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSnapshot {
    #[serde(default)]
    pub upload_total: u64,
    #[serde(default)]
    pub download_total: u64,
    /// Wire name is `connections`; each entry is a live-table row.
    #[serde(rename = "connections", default)]
    pub groups: Vec<ConnectionGroup>,
}

impl ConnectionSnapshot {
    /// Total number of underlying sessions across all groups.
    pub fn session_count(&self) -> usize {
        self.groups.iter().map(|g| g.details.len()).sum()
    }

    /// Iterate all session details across all groups.
    pub fn details(&self) -> impl Iterator<Item = &ConnectionDetail> {
        self.groups.iter().flat_map(|g| g.details.iter())
    }
}

/// A live-table row: one real session or a synthetic aggregation of several.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionGroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub metadata: ConnMetadata,
    #[serde(default)]
    pub upload: u64,
    #[serde(default)]
    pub download: u64,
    #[serde(default)]
    pub connection_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub details: Vec<ConnectionDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl ConnectionGroup {
    pub fn last_seen_ms(&self) -> Option<i64> {
        self.last_seen.map(|t| t.timestamp_millis())
    }
}

/// One underlying network session. Counters are cumulative and monotonic
/// while the session is alive; the `id` is the stable session key.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetail {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub metadata: ConnMetadata,
    #[serde(default)]
    pub upload: u64,
    #[serde(default)]
    pub download: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl ConnectionDetail {
    pub fn last_seen_ms(&self) -> Option<i64> {
        self.last_seen.map(|t| t.timestamp_millis())
    }
}

/// Session metadata as reported by the core. All fields are optional on the
/// wire; absent ones normalize to empty strings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConnMetadata {
    #[serde(default)]
    pub network: String,
    #[serde(rename = "type", default)]
    pub conn_type: String,
    #[serde(rename = "sourceIP", default)]
    pub source_ip: String,
    #[serde(rename = "sourcePort", default)]
    pub source_port: String,
    #[serde(rename = "destinationIP", default)]
    pub destination_ip: String,
    #[serde(rename = "destinationPort", default)]
    pub destination_port: String,
    #[serde(default)]
    pub host: String,
    #[serde(rename = "domainSource", default)]
    pub domain_source: String,
    #[serde(rename = "inboundTag", default)]
    pub inbound_tag: String,
    #[serde(rename = "outboundTag", default)]
    pub outbound_tag: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub alpn: String,
    #[serde(default)]
    pub process: String,
}

impl ConnMetadata {
    /// Destination label for display and destination-mode bucketing:
    /// the sniffed host when present, otherwise the destination IP.
    pub fn destination_label(&self) -> &str {
        if self.host.is_empty() {
            &self.destination_ip
        } else {
            &self.host
        }
    }
}

/// Instantaneous throughput in bytes per second, derived by finite
/// differencing of cumulative counters. Never negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RateSample {
    pub upload: f64,
    pub download: f64,
}

/// A session that vanished from the live snapshot, preserved from its last
/// known state. Group-shaped so closed and live rows render identically.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedConnectionRecord {
    #[serde(flatten)]
    pub group: ConnectionGroup,
    /// Unix milliseconds at processing time of the snapshot that dropped it.
    pub closed_at: i64,
}

/// One point of the rolling chart series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrafficSample {
    /// Unix milliseconds.
    pub time: i64,
    /// Upload delta since the previous sample, clamped at zero.
    pub up: u64,
    /// Download delta since the previous sample, clamped at zero.
    pub down: u64,
    pub total_up: u64,
    pub total_down: u64,
    pub sessions: usize,
}

/// Push-subscription status, surfaced to the console as a label only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Connecting,
    Live,
    Reconnecting,
    Paused,
    Idle,
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Live => write!(f, "live"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Paused => write!(f, "paused"),
            Self::Idle => write!(f, "idle"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_count_sums_details() {
        let snap = ConnectionSnapshot {
            upload_total: 0,
            download_total: 0,
            groups: vec![
                ConnectionGroup {
                    details: vec![ConnectionDetail::default(), ConnectionDetail::default()],
                    ..Default::default()
                },
                ConnectionGroup {
                    details: vec![ConnectionDetail::default()],
                    ..Default::default()
                },
            ],
        };
        assert_eq!(snap.session_count(), 3);
    }

    #[test]
    fn destination_label_prefers_host() {
        let mut meta = ConnMetadata {
            host: "example.com".to_string(),
            destination_ip: "1.2.3.4".to_string(),
            ..Default::default()
        };
        assert_eq!(meta.destination_label(), "example.com");
        meta.host.clear();
        assert_eq!(meta.destination_label(), "1.2.3.4");
    }

    #[test]
    fn status_labels() {
        assert_eq!(StreamStatus::Live.to_string(), "live");
        assert_eq!(StreamStatus::Reconnecting.to_string(), "reconnecting");
    }
}
