//! CDP error types.

use caseprobe_core::DriverError;
use thiserror::Error;

/// CDP client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to Chrome.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Chrome not running with remote debugging on the endpoint.
    #[error("Chrome not available at {0}")]
    ChromeNotAvailable(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Error object returned by the browser.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error (for endpoint discovery).
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Exception thrown by evaluated JavaScript.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CdpError {
    /// Whether the browser reported that a node or execution context is gone.
    pub fn is_detached(&self) -> bool {
        match self {
            CdpError::Protocol { message, .. } => {
                let message = message.to_ascii_lowercase();
                message.contains("cannot find context")
                    || message.contains("could not find node")
                    || message.contains("no node")
                    || message.contains("not attached")
                    || message.contains("execution context was destroyed")
            }
            CdpError::JavaScript(text) => text.contains("Execution context was destroyed"),
            _ => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}

impl From<CdpError> for DriverError {
    fn from(e: CdpError) -> Self {
        if e.is_detached() {
            return DriverError::Detached(e.to_string());
        }
        match e {
            CdpError::Timeout(what) => DriverError::Timeout(what),
            CdpError::ConnectionFailed(_) | CdpError::ChromeNotAvailable(_) => {
                DriverError::Launch(e.to_string())
            }
            CdpError::NavigationFailed(what) => DriverError::Navigation(what),
            CdpError::JavaScript(text) => DriverError::Script(text),
            other => DriverError::Protocol(other.to_string()),
        }
    }
}
