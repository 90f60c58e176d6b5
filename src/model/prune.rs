use crate::model::ConnectionSnapshot;

/// Drop details that fell out of the dashboard's rolling window and
/// recompute every aggregate from the survivors.
///
/// A detail survives when its `last_seen` lies in `[now - window, now]`;
/// details without a timestamp are always kept. Group byte totals and
/// `connection_count` are recomputed from surviving details, empty groups
/// are dropped, and the snapshot totals become the sum over survivors.
///
/// Only the dashboard uses this; the connections page always renders the
/// unpruned snapshot.
pub fn prune(snapshot: &ConnectionSnapshot, now_ms: i64, window_ms: i64) -> ConnectionSnapshot {
    let cutoff = now_ms - window_ms;
    let mut out = ConnectionSnapshot {
        upload_total: 0,
        download_total: 0,
        groups: Vec::with_capacity(snapshot.groups.len()),
    };

    for group in &snapshot.groups {
        let mut kept = group.clone();
        kept.details.retain(|d| match d.last_seen_ms() {
            Some(ts) => ts >= cutoff && ts <= now_ms,
            None => true,
        });
        if kept.details.is_empty() {
            continue;
        }
        kept.upload = kept.details.iter().map(|d| d.upload).sum();
        kept.download = kept.details.iter().map(|d| d.download).sum();
        kept.connection_count = kept.details.len() as u32;
        out.upload_total += kept.upload;
        out.download_total += kept.download;
        out.groups.push(kept);
    }

    out
}
