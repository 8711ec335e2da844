use thiserror::Error;

/// Unified result type for the dashgrid crate.
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors surfaced by the grid engine and its collaborators. Placement
/// rejections are not errors: an invalid claim or add is a silent no-op and
/// callers observe a boolean instead.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("widget kind `{0}` declares no sizes")]
    EmptyAllowlist(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
