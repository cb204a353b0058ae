mod logging;
mod paths;

pub use logging::init_logging;
pub use paths::{RunConfig, RunPaths, start_run, write_json};

use thiserror::Error;

/// Errors raised while preparing run artifacts.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
}

pub type RunResult<T> = std::result::Result<T, RunError>;
