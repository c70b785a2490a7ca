use std::io;
use thiserror::Error;

/// Error type for metric backends.
///
/// Backends report why they could not produce a value; the aggregator turns
/// every one of these into an absent reading, so none of them reach callers
/// of the metrics API.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} did not finish within {timeout_ms} ms")]
    Timeout { tool: String, timeout_ms: u128 },

    #[error("Failed to parse output: {0}")]
    Parse(String),

    #[error("Not supported by this backend: {0}")]
    Unsupported(String),

    #[error("Hardware monitor binding unavailable: {0}")]
    BindingUnavailable(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for overlay-monitor
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    pub fn tool_not_found<S: Into<String>>(tool: S) -> Self {
        MonitorError::ToolNotFound(tool.into())
    }

    pub fn parse<S: Into<String>>(msg: S) -> Self {
        MonitorError::Parse(msg.into())
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        MonitorError::Unsupported(msg.into())
    }

    pub fn binding_unavailable<S: Into<String>>(msg: S) -> Self {
        MonitorError::BindingUnavailable(msg.into())
    }

    pub fn no_data<S: Into<String>>(msg: S) -> Self {
        MonitorError::NoData(msg.into())
    }
}
