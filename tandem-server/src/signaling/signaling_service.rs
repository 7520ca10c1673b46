use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::signaling::{ConnectionId, Outbound, SignalingOutput};

struct SignalingInner {
    peers: DashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>,
}

/// Per-connection outbound queues for live WebSocket connections.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
            }),
        }
    }

    pub fn add_peer(&self, id: ConnectionId, tx: mpsc::UnboundedSender<Outbound>) {
        self.inner.peers.insert(id, tx);
    }

    pub fn remove_peer(&self, id: &ConnectionId) {
        self.inner.peers.remove(id);
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }
}

impl Default for SignalingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn deliver(&self, to: &ConnectionId, outbound: Outbound) {
        if let Some(peer) = self.inner.peers.get(to) {
            if let Err(e) = peer.send(outbound) {
                error!("Failed to queue WS message for {}: {:?}", to, e);
            }
        } else {
            warn!("Attempted to send signal to disconnected connection {}", to);
        }
    }
}
