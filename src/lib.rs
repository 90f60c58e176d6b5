pub mod api;
pub mod cli;
pub mod error;
pub mod model;
pub mod output;
pub mod state;
pub mod stream;
pub mod tui;
pub mod view;
