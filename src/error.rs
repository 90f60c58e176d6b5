#[derive(Debug, thiserror::Error)]
pub enum FlowdeckError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("endpoint returned HTTP {0}")]
    HttpStatus(u16),
    #[error("malformed payload")]
    MalformedPayload,
    #[error("close action failed: {0}")]
    Action(String),
    #[error("TUI error: {0}")]
    Tui(#[source] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[source] std::io::Error),
    #[error("fatal: {0}")]
    Fatal(String),
}
