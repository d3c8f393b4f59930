//! Common error types for Lingo

use thiserror::Error;

/// Common result type for Lingo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Lingo crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed TOML or JSON input
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid caller input (e.g. a subtitle with end before start)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
