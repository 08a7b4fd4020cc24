//! Control-side error types for the node engine.
//!
//! Nothing on the audio thread returns these; they surface from the handle,
//! the configuration loader, and the driver host.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported to control-thread callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The task queue has no free slots; the task was not enqueued.
    #[error("task queue is full")]
    TaskQueueFull,

    /// The node manager that owned the receiving end has been dropped.
    #[error("node manager is gone")]
    Disconnected,

    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for `EngineConfig`.
    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] serde_json::Error),

    /// The configuration parsed but holds unusable values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(EngineError::TaskQueueFull.to_string(), "task queue is full");
        assert_eq!(
            EngineError::InvalidConfig("sample_rate must be positive".into()).to_string(),
            "invalid config: sample_rate must be positive"
        );
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: EngineError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, EngineError::ParseConfig(_)));
    }
}
