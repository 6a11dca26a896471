//! Error types for the priority engine.

/// Top-level error type for snapshotting, publishing and mirroring rankings.
#[derive(Debug, thiserror::Error)]
pub enum PriorityError {
    /// Configuration load, save or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Local state snapshot could not be read.
    #[error("state error: {0}")]
    State(String),

    /// Result store persistence error.
    #[error("store error: {0}")]
    Store(String),

    /// Remote mirror push or fetch error.
    #[error("mirror error: {0}")]
    Mirror(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PriorityError>;
