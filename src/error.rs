use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Construction and configuration errors
// =============================================================================

/// Errors raised while building a pipeline. Everything here happens before a
/// task is spawned, so a failed construction never leaves anything running.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("emitter interval must be greater than zero")]
    ZeroInterval,

    #[error("channel capacity must be at least 1")]
    ZeroCapacity,

    #[error("invalid value for '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl PipelineError {
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

// =============================================================================
// Channel operation errors
// =============================================================================

/// The reader went away, so the item could not be delivered. The item is
/// handed back to the caller.
#[derive(Error, PartialEq, Eq)]
pub enum WriteError<T> {
    #[error("channel reader was dropped")]
    Disconnected(T),
}

impl<T> WriteError<T> {
    pub fn into_inner(self) -> T {
        match self {
            WriteError::Disconnected(item) => item,
        }
    }
}

// Manual impl so `T` does not need to be `Debug`.
impl<T> fmt::Debug for WriteError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Disconnected(_) => f.write_str("Disconnected(..)"),
        }
    }
}

#[derive(Error, PartialEq, Eq)]
pub enum TryWriteError<T> {
    #[error("channel is full")]
    Full(T),
    #[error("channel reader was dropped")]
    Disconnected(T),
}

impl<T> TryWriteError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TryWriteError::Full(item) | TryWriteError::Disconnected(item) => item,
        }
    }
}

impl<T> fmt::Debug for TryWriteError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryWriteError::Full(_) => f.write_str("Full(..)"),
            TryWriteError::Disconnected(_) => f.write_str("Disconnected(..)"),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// Open, but nothing buffered right now.
    #[error("channel is empty")]
    Empty,
    /// Closed and every buffered item has been read.
    #[error("channel is closed and drained")]
    Drained,
}
