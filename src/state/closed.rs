use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::model::{ClosedConnectionRecord, ConnectionGroup, ConnectionSnapshot};

/// Default ledger capacity.
pub const DEFAULT_CAPACITY: usize = 500;

/// Last-known state of a live session, kept so a record can be synthesized
/// the moment the session vanishes.
#[derive(Clone)]
struct LastKnown {
    group: ConnectionGroup,
}

/// Detects session termination by set-difference against the prior snapshot
/// and keeps a bounded, newest-first ledger of the vanished sessions.
///
/// Nothing in the protocol signals termination explicitly: a session is
/// closed exactly when its detail id stops appearing in a newer snapshot.
/// `observe` must therefore run once per accepted snapshot, upstream of any
/// render coalescing, or a burst of pushes could overwrite a snapshot whose
/// closures were never diffed.
pub struct ClosedTracker {
    prev: FxHashMap<String, LastKnown>,
    records: VecDeque<ClosedConnectionRecord>,
    capacity: usize,
}

impl ClosedTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            prev: FxHashMap::default(),
            records: VecDeque::new(),
            capacity,
        }
    }

    /// Diff `snapshot` against the previously observed one, appending a
    /// record for every session that vanished. Returns how many closed.
    ///
    /// If two details carried the same id in the prior snapshot (rapid id
    /// reuse), the index keeps the last one walked: last-write-wins.
    pub fn observe(&mut self, snapshot: &ConnectionSnapshot, now_ms: i64) -> usize {
        let mut next: FxHashMap<String, LastKnown> = FxHashMap::default();
        for group in &snapshot.groups {
            for detail in &group.details {
                next.insert(
                    detail.id.clone(),
                    LastKnown {
                        group: ConnectionGroup {
                            id: detail.id.clone(),
                            metadata: detail.metadata.clone(),
                            upload: detail.upload,
                            download: detail.download,
                            connection_count: 1,
                            start: detail.start,
                            last_seen: detail.last_seen,
                            details: vec![detail.clone()],
                            rule: detail.rule.clone().or_else(|| group.rule.clone()),
                        },
                    },
                );
            }
        }

        let mut closed = 0;
        for (id, last) in self.prev.drain() {
            if next.contains_key(&id) {
                continue;
            }
            self.records.push_front(ClosedConnectionRecord {
                group: last.group,
                closed_at: now_ms,
            });
            closed += 1;
        }
        self.records.truncate(self.capacity);
        self.prev = next;
        closed
    }

    /// Ledger contents, newest first.
    pub fn records(&self) -> &VecDeque<ClosedConnectionRecord> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forget both the ledger and the prior id-set, e.g. when the endpoint
    /// changes and session ids lose meaning.
    pub fn reset(&mut self) {
        self.prev.clear();
        self.records.clear();
    }
}

impl Default for ClosedTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
