//! Error types for lingo-engine
//!
//! Most faults inside a tick are isolated rather than propagated: a failing
//! strategy, reducer or scheduled task is logged and recorded in the trace,
//! and the rest of the tick proceeds. These variants describe those faults
//! and the few operations that do fail outright.

use thiserror::Error;

/// Main error type for lingo-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the common crate (configuration, track loading)
    #[error(transparent)]
    Common(#[from] lingo_common::Error),

    /// A strategy hook failed
    #[error("Strategy '{name}' failed: {message}")]
    Strategy { name: String, message: String },

    /// A domain reducer failed
    #[error("Reducer for domain '{domain}' failed: {message}")]
    Reducer { domain: String, message: String },

    /// A scheduled task callback failed
    #[error("Scheduled task {id} failed: {message}")]
    Task { id: u64, message: String },

    /// The media transport rejected a command
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid scheduler operation (e.g. scheduling after dispose)
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// A guarded call panicked
    #[error("Panicked: {0}")]
    Panicked(String),
}

/// Convenience Result type using lingo-engine Error
pub type Result<T> = std::result::Result<T, Error>;
