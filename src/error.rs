//! Error types for kvclient

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown balancer strategy: {0}")]
    UnknownBalancer(String),

    // === Validation Errors ===
    #[error("Invalid client id: {0}")]
    InvalidClientId(String),

    // === Backend Errors ===
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Remote error ({code}): {message}")]
    Remote { code: u32, message: String },

    #[error("Operation not supported by the {0} backend")]
    Unsupported(&'static str),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

// Implement From for common error types
impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
