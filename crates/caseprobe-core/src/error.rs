//! Driver errors: the only failures the engine propagates.

use thiserror::Error;

/// Faults raised by a browser driver implementation.
///
/// Locator lookups never surface these; they degrade to "not found". What
/// remains reaches the run boundary and becomes a `failed` result.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The browser or automation driver is not installed.
    #[error("Browser driver unavailable: {0}")]
    Unavailable(String),

    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// Frame or element handle no longer attached to the document.
    #[error("Detached: {0}")]
    Detached(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout(_))
    }
}
