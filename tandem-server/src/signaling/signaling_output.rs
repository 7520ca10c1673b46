use async_trait::async_trait;
use tandem_core::SignalMessage;

use crate::signaling::ConnectionId;

/// Something the relay wants done to one connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Signal(SignalMessage),
    /// Close the transport once everything queued before it has been written.
    Close,
}

/// Where the relay sends its replies and forwarded frames.
///
/// The WebSocket layer implements this over per-connection channels; tests
/// swap in a recorder.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Unknown connections are ignored.
    async fn deliver(&self, to: &ConnectionId, outbound: Outbound);
}
