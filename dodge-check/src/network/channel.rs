//! Shared Handshake Channel
//!
//! Single-topic pub/sub carrying JSON-encoded [`HandshakeMessage`]s.
//! Every subscriber, the publisher included, sees every message.

use tokio::sync::broadcast;
use tracing::debug;

use crate::network::protocol::HandshakeMessage;

/// Default buffered messages per subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Message could not be encoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Broadcast channel shared by every participant runtime.
#[derive(Debug, Clone)]
pub struct BroadcastChannel {
    tx: broadcast::Sender<String>,
}

impl BroadcastChannel {
    /// Create a channel buffering `capacity` messages per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a message to every current subscriber.
    ///
    /// Returns how many subscribers received it. Publishing with nobody
    /// listening is not an error.
    pub fn publish(&self, message: &HandshakeMessage) -> Result<usize, ChannelError> {
        let payload = message.to_json()?;
        let delivered = self.tx.send(payload).unwrap_or(0);
        debug!(kind = message.kind(), subscribers = delivered, "published");
        Ok(delivered)
    }

    /// Subscribe to messages published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
