//! Transport trait abstraction for pluggable duplex frame streams

use anyhow::Result;
use async_trait::async_trait;

/// Events delivered by a transport's read side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One whole text frame arrived
    Frame(String),
    /// The connection closed. `code` is non-zero when the close carried an
    /// error signal.
    Closed { code: i32, reason: Option<String> },
}

/// A duplex, message-oriented connection to the controller
#[async_trait]
pub trait Transport: Send {
    /// Send one whole text frame
    async fn send(&self, frame: &str) -> Result<()>;

    /// Request connection close. Safe to call more than once.
    async fn close(&self);
}
