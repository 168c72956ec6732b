//! Event loop error types

use std::fmt;

/// Result type for event loop setup and cross-thread posting
pub type LoopResult<T> = Result<T, LoopError>;

/// Errors raised by the runtime (channel outcomes live in `ChanError`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopError {
    /// Configuration rejected by `LoopConfig::validate`
    InvalidConfig(&'static str),
    /// The `Remote` injection queue had no room
    RemoteQueueFull,
}

impl fmt::Display for LoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            LoopError::RemoteQueueFull => write!(f, "Remote queue full"),
        }
    }
}

impl std::error::Error for LoopError {}

/// A closure handed back by `Remote::post` because the queue was full
pub struct RemoteFull(pub Box<dyn FnOnce() + Send>);

impl RemoteFull {
    /// Recover the rejected closure, e.g. to retry later
    pub fn into_inner(self) -> Box<dyn FnOnce() + Send> {
        self.0
    }
}

impl fmt::Debug for RemoteFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RemoteFull(..)")
    }
}

impl fmt::Display for RemoteFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&LoopError::RemoteQueueFull, f)
    }
}

impl std::error::Error for RemoteFull {}

impl From<RemoteFull> for LoopError {
    fn from(_: RemoteFull) -> Self {
        LoopError::RemoteQueueFull
    }
}
