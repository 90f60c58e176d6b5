use crate::model::{ConnectionDetail, ConnectionSnapshot};

/// Convert a raw push payload into a canonical [`ConnectionSnapshot`].
///
/// Never panics and never errors outward: a payload that fails to parse
/// yields `None` and the caller keeps its previous state. Missing
/// `connections` becomes an empty group list (serde defaults), and the
/// following fixups are applied:
///
/// - `connectionCount` unset or non-positive defaults to 1;
/// - a group with no `details` gets one synthetic detail mirroring the
///   group itself, so flat payloads (one session per row) stay usable;
/// - a detail with an empty id inherits the group id.
pub fn normalize(raw: &str) -> Option<ConnectionSnapshot> {
    let mut snapshot: ConnectionSnapshot = match serde_json::from_str(raw) {
        Ok(s) => s,
        Err(e) => {
            log::debug!("dropping malformed payload: {e}");
            return None;
        }
    };

    for group in &mut snapshot.groups {
        if group.connection_count == 0 {
            group.connection_count = 1;
        }
        if group.details.is_empty() {
            group.details.push(ConnectionDetail {
                id: group.id.clone(),
                metadata: group.metadata.clone(),
                upload: group.upload,
                download: group.download,
                start: group.start,
                last_seen: group.last_seen,
                rule: group.rule.clone(),
            });
        }
        for detail in &mut group.details {
            if detail.id.is_empty() {
                detail.id = group.id.clone();
            }
        }
    }

    Some(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_yields_none() {
        assert!(normalize("not json").is_none());
        assert!(normalize("").is_none());
        assert!(normalize("[1,2,3]").is_none());
    }

    #[test]
    fn missing_connections_is_empty() {
        let snap = normalize(r#"{"uploadTotal":10,"downloadTotal":20}"#).unwrap();
        assert_eq!(snap.upload_total, 10);
        assert_eq!(snap.download_total, 20);
        assert!(snap.groups.is_empty());
    }

    #[test]
    fn connection_count_defaults_to_one() {
        let snap = normalize(
            r#"{"connections":[{"id":"g1","upload":5,"download":6}]}"#,
        )
        .unwrap();
        assert_eq!(snap.groups[0].connection_count, 1);
    }

    #[test]
    fn flat_group_gets_synthetic_detail() {
        let snap = normalize(
            r#"{"connections":[{"id":"g1","upload":5,"download":6,"rule":"direct"}]}"#,
        )
        .unwrap();
        let g = &snap.groups[0];
        assert_eq!(g.details.len(), 1);
        assert_eq!(g.details[0].id, "g1");
        assert_eq!(g.details[0].upload, 5);
        assert_eq!(g.details[0].rule.as_deref(), Some("direct"));
    }

    #[test]
    fn nested_details_are_preserved() {
        let snap = normalize(
            r#"{"uploadTotal":1000,"downloadTotal":500,"connections":[
                {"id":"g1","details":[
                    {"id":"d1","upload":1000,"download":500,
                     "metadata":{"sourceIP":"10.0.0.1","host":"example.com"}}
                ]}
            ]}"#,
        )
        .unwrap();
        let d = &snap.groups[0].details[0];
        assert_eq!(d.id, "d1");
        assert_eq!(d.metadata.source_ip, "10.0.0.1");
        assert_eq!(d.metadata.host, "example.com");
    }

    #[test]
    fn detail_without_id_inherits_group_id() {
        let snap = normalize(
            r#"{"connections":[{"id":"g1","details":[{"upload":1}]}]}"#,
        )
        .unwrap();
        assert_eq!(snap.groups[0].details[0].id, "g1");
    }

    #[test]
    fn wire_timestamps_parse() {
        let snap = normalize(
            r#"{"connections":[{"id":"g1","start":"2026-01-01T00:00:00Z",
                "lastSeen":"2026-01-01T00:00:05Z"}]}"#,
        )
        .unwrap();
        let g = &snap.groups[0];
        assert!(g.start.is_some());
        assert_eq!(
            g.last_seen_ms().unwrap() - g.start.unwrap().timestamp_millis(),
            5_000
        );
    }
}
