use std::cmp::Ordering;

use clap::ValueEnum;
use rustc_hash::FxHashMap;

use crate::model::{ConnectionGroup, RateSample};

/// Sortable columns of the live table.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Destination host / bucket label.
    #[default]
    Host,
    /// Source IP.
    Source,
    /// Matched rule.
    Rule,
    /// Session count.
    Sessions,
    /// Live upload rate (not the cumulative total).
    Upload,
    /// Live download rate (not the cumulative total).
    Download,
}

impl SortKey {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Sessions | Self::Upload | Self::Download)
    }

    /// Type-appropriate default direction: strings ascend, numbers descend.
    pub fn default_dir(self) -> SortDir {
        if self.is_numeric() {
            SortDir::Descending
        } else {
            SortDir::Ascending
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Host => Self::Source,
            Self::Source => Self::Rule,
            Self::Rule => Self::Sessions,
            Self::Sessions => Self::Upload,
            Self::Upload => Self::Download,
            Self::Download => Self::Host,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Source => "source",
            Self::Rule => "rule",
            Self::Sessions => "sessions",
            Self::Upload => "up rate",
            Self::Download => "down rate",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Ascending,
    Descending,
}

impl SortDir {
    pub fn flip(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Self::Ascending => "^",
            Self::Descending => "v",
        }
    }
}

/// Current ordering, with the click/keypress semantics of a table header:
/// selecting the already-active key flips the direction, selecting a new key
/// resets to that key's default direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub dir: SortDir,
}

impl SortSpec {
    pub fn new(key: SortKey) -> Self {
        Self {
            key,
            dir: key.default_dir(),
        }
    }

    pub fn click(self, key: SortKey) -> Self {
        if key == self.key {
            Self {
                key,
                dir: self.dir.flip(),
            }
        } else {
            Self::new(key)
        }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new(SortKey::default())
    }
}

/// Case-insensitive natural comparison: digit runs compare numerically, the
/// rest byte-wise on the lowercased form, so `host2` sorts before `host10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().flat_map(|c| c.to_lowercase()).peekable();
    let mut bi = b.chars().flat_map(|c| c.to_lowercase()).peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let na = take_number(&mut ai);
                    let nb = take_number(&mut bi);
                    match na.cmp(&nb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    match ca.cmp(&cb) {
                        Ordering::Equal => {
                            ai.next();
                            bi.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_number<I: Iterator<Item = char>>(it: &mut std::iter::Peekable<I>) -> u128 {
    let mut n: u128 = 0;
    while let Some(c) = it.peek() {
        match c.to_digit(10) {
            Some(d) => {
                n = n.saturating_mul(10).saturating_add(d as u128);
                it.next();
            }
            None => break,
        }
    }
    n
}

fn rate_of(rates: &FxHashMap<String, RateSample>, id: &str) -> RateSample {
    rates.get(id).copied().unwrap_or_default()
}

/// Order the grouped view in place. Byte columns sort by the live rate from
/// `rates`, not by cumulative totals, so the heaviest current talkers float
/// to the top.
pub fn sort_groups(
    groups: &mut [ConnectionGroup],
    spec: SortSpec,
    rates: &FxHashMap<String, RateSample>,
) {
    groups.sort_by(|a, b| {
        let ord = match spec.key {
            SortKey::Host => natural_cmp(
                a.metadata.destination_label(),
                b.metadata.destination_label(),
            ),
            SortKey::Source => natural_cmp(&a.metadata.source_ip, &b.metadata.source_ip),
            SortKey::Rule => natural_cmp(
                a.rule.as_deref().unwrap_or(""),
                b.rule.as_deref().unwrap_or(""),
            ),
            SortKey::Sessions => a.connection_count.cmp(&b.connection_count),
            SortKey::Upload => rate_of(rates, &a.id)
                .upload
                .partial_cmp(&rate_of(rates, &b.id).upload)
                .unwrap_or(Ordering::Equal),
            SortKey::Download => rate_of(rates, &a.id)
                .download
                .partial_cmp(&rate_of(rates, &b.id).download)
                .unwrap_or(Ordering::Equal),
        };
        match spec.dir {
            SortDir::Ascending => ord,
            SortDir::Descending => ord.reverse(),
        }
    });
}

/// Free-text search over a flattened textual projection of the whole group
/// subtree, details included. Case-insensitive substring; a match anywhere
/// keeps the group.
pub fn matches_search(group: &ConnectionGroup, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    flatten_text(group).contains(&needle)
}

fn flatten_text(group: &ConnectionGroup) -> String {
    let mut text = String::new();
    let mut push = |s: &str| {
        if !s.is_empty() {
            text.push_str(&s.to_lowercase());
            text.push('\n');
        }
    };

    push(&group.id);
    push_meta(&group.metadata, &mut push);
    push(group.rule.as_deref().unwrap_or(""));
    for detail in &group.details {
        push(&detail.id);
        push_meta(&detail.metadata, &mut push);
        push(detail.rule.as_deref().unwrap_or(""));
    }
    text
}

fn push_meta(meta: &crate::model::ConnMetadata, push: &mut impl FnMut(&str)) {
    push(&meta.host);
    push(&meta.source_ip);
    push(&meta.source_port);
    push(&meta.destination_ip);
    push(&meta.destination_port);
    push(&meta.network);
    push(&meta.conn_type);
    push(&meta.inbound_tag);
    push(&meta.outbound_tag);
    push(&meta.user);
    push(&meta.process);
    push(&meta.domain_source);
    push(&meta.alpn);
}
