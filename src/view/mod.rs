pub mod group;
pub mod sort;

pub use group::{build_view, merge_label, GroupMode};
pub use sort::{matches_search, sort_groups, SortDir, SortKey, SortSpec};
