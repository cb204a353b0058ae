use thiserror::Error;

/// Core error type shared across fakeschema crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The catalog violates internal invariants.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
    /// Directive parameters or operator inputs are malformed.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by fakeschema crates.
pub type Result<T> = std::result::Result<T, Error>;
