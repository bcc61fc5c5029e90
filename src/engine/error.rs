//! Facade-level error taxonomy. Components never swallow
//! errors silently; `Engine` maps these to the HTTP boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("range too large ({size} bytes > cap {cap} bytes); narrow the time range")]
    TruncatedByCap { size: u64, cap: u64 },

    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
