//! Common error types
//!
//! One flat taxonomy for the supervisor. There are no automatic retries
//! anywhere: every variant surfaces to the caller immediately, since a
//! half-started supervisor is worse than a clean failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Server executable missing or not spawnable; fatal to start
    #[error("Launch error: {0}")]
    Launch(String),

    /// No free local port or the callback listener could not bind
    #[error("Port bind error: {0}")]
    PortBind(String),

    /// Malformed callback payload; rejected without touching state
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (brightness device, child configuration file, ...)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

impl From<events::EventError> for Error {
    fn from(err: events::EventError) -> Self {
        Error::BadRequest(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
