use serde::{Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the audio session adapter and the routing core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Caller supplied an output type token that is not recognized
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Category or activation configuration was rejected by the OS
    #[error("Session setup failed: {0}")]
    SessionSetup(String),

    /// The OS refused the output override after a successful setup
    #[error("Override rejected: {0}")]
    OverrideRejected(String),

    /// The connected output set could not be queried
    #[error("Route query failed: {0}")]
    RouteQuery(String),

    /// Registering for OS notifications failed
    #[error("Subscription failed: {0}")]
    Subscription(String),

    /// A hardware command did not complete in time
    #[error("Session command timed out after {0:?}")]
    Timeout(Duration),

    /// An adapter call panicked while running on the worker
    #[error("Audio session adapter panicked")]
    AdapterPanicked,

    /// The session worker is gone and can no longer run commands
    #[error("Session worker unavailable")]
    WorkerUnavailable,
}

impl SessionError {
    /// Whether the error is fatal to the operation that raised it
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::InvalidInput(_))
    }
}

impl Serialize for SessionError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
