use serde::Serialize;
use tandem_core::Role;

use crate::engine::{IceConnectionState, PeerConnectionState};

/// What the status badge shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    /// Wording differs per device: the host is a laptop waiting for a phone.
    pub fn label(self, role: Role) -> &'static str {
        match (role, self) {
            (Role::Host, ConnectionStatus::Connecting) => "waiting for phone",
            (Role::Host, ConnectionStatus::Connected) => "phone connected",
            (Role::Host, ConnectionStatus::Disconnected) => "disconnected",
            (Role::Guest, ConnectionStatus::Connecting) => "connecting",
            (Role::Guest, ConnectionStatus::Connected) => "connected",
            (Role::Guest, ConnectionStatus::Disconnected) => "retry",
        }
    }

    pub fn from_peer_state(state: PeerConnectionState) -> Option<Self> {
        match state {
            PeerConnectionState::Connected => Some(ConnectionStatus::Connected),
            PeerConnectionState::Connecting => Some(ConnectionStatus::Connecting),
            PeerConnectionState::Failed
            | PeerConnectionState::Disconnected
            | PeerConnectionState::Closed => Some(ConnectionStatus::Disconnected),
            PeerConnectionState::New => None,
        }
    }

    /// ICE reporting `closed` says nothing new once the connection state
    /// has already been reported, so it is ignored.
    pub fn from_ice_state(state: IceConnectionState) -> Option<Self> {
        match state {
            IceConnectionState::Connected | IceConnectionState::Completed => {
                Some(ConnectionStatus::Connected)
            }
            IceConnectionState::Checking => Some(ConnectionStatus::Connecting),
            IceConnectionState::Failed | IceConnectionState::Disconnected => {
                Some(ConnectionStatus::Disconnected)
            }
            IceConnectionState::New | IceConnectionState::Closed => None,
        }
    }
}
