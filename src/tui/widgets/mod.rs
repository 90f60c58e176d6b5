pub mod format;
pub mod search_bar;
pub mod sparkline;

pub use search_bar::SearchBar;
