use std::fmt;
use tandem_core::{Role, RoomCode};
use uuid::Uuid;

/// Identity of one transport connection, stable for its lifetime.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unbound,
    Bound { room: RoomCode, role: Role },
    Closed,
}

/// Relay-side bookkeeping for one connection: who it is and which slot it
/// occupies. Owned by the task reading that connection.
#[derive(Debug)]
pub struct ConnectionContext {
    id: ConnectionId,
    state: ConnectionState,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self::with_id(ConnectionId::new())
    }

    pub fn with_id(id: ConnectionId) -> Self {
        Self {
            id,
            state: ConnectionState::Unbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn binding(&self) -> Option<(&RoomCode, Role)> {
        match &self.state {
            ConnectionState::Bound { room, role } => Some((room, *role)),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    pub(crate) fn bind(&mut self, room: RoomCode, role: Role) {
        self.state = ConnectionState::Bound { room, role };
    }

    /// Marks the connection closed and hands back the slot it held.
    pub(crate) fn close(&mut self) -> Option<(RoomCode, Role)> {
        match std::mem::replace(&mut self.state, ConnectionState::Closed) {
            ConnectionState::Bound { room, role } => Some((room, role)),
            _ => None,
        }
    }
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self::new()
    }
}
