//! Event decoding error types

use thiserror::Error;

/// Errors produced while decoding callback payloads
#[derive(Debug, Error)]
pub enum EventError {
    /// Payload was not well-formed JSON or a required field was absent
    #[error("Malformed callback payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload exceeded the maximum accepted size
    #[error("Callback payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Type alias for event results
pub type Result<T> = std::result::Result<T, EventError>;
