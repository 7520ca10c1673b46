use std::sync::Arc;
use tandem_core::{PeerRef, ProtocolError, Role, RoomCode, SignalKind, SignalMessage};
use tracing::{debug, info, warn};

use crate::error::RoomFull;
use crate::room::RoomRegistry;
use crate::signaling::{ConnectionContext, ConnectionId, Outbound, SignalingOutput};

/// What the transport loop should do after a frame was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Deliveries produced while a room entry was locked; flushed afterwards.
type Outbox = Vec<(ConnectionId, Outbound)>;

/// Routes signaling frames between the two slots of a room.
///
/// The relay owns no connection state itself: every call gets the
/// [`ConnectionContext`] of the connection the frame arrived on.
pub struct SignalRelay {
    registry: RoomRegistry,
    output: Arc<dyn SignalingOutput>,
}

impl SignalRelay {
    pub fn new(registry: RoomRegistry, output: Arc<dyn SignalingOutput>) -> Self {
        Self { registry, output }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Handles one inbound text frame to completion.
    pub async fn handle_text(&self, conn: &mut ConnectionContext, text: &str) -> Flow {
        if conn.is_closed() {
            return Flow::Close;
        }

        let mut outbox = Outbox::new();
        let handled = SignalMessage::from_client_json(text)
            .and_then(|message| self.dispatch(conn, message, &mut outbox));
        let flow = match handled {
            Ok(flow) => flow,
            Err(e) => {
                warn!("Rejected frame from {}: {:?}", conn.id(), e);
                outbox.push((conn.id(), Outbound::Signal(SignalMessage::error(e.to_string()))));
                Flow::Continue
            }
        };

        self.flush(outbox).await;
        flow
    }

    /// Releases whatever slot the connection held and tells the peer.
    pub async fn handle_close(&self, conn: &mut ConnectionContext) {
        let mut outbox = Outbox::new();
        if let Some((code, role)) = conn.close() {
            self.vacate(conn.id(), &code, role, &mut outbox);
        }
        info!("Connection {} closed", conn.id());
        self.flush(outbox).await;
    }

    fn dispatch(
        &self,
        conn: &mut ConnectionContext,
        message: SignalMessage,
        outbox: &mut Outbox,
    ) -> Result<Flow, ProtocolError> {
        let code = message.room_code.clone().ok_or(ProtocolError::MissingField)?;
        match message.kind {
            SignalKind::JoinRoom => {
                let role = message.requested_role()?;
                Ok(self.join(conn, code, role, outbox))
            }
            kind if kind.is_relayed() => {
                self.forward(conn, code, message, outbox)?;
                Ok(Flow::Continue)
            }
            kind => Err(ProtocolError::UnknownType(kind.to_string())),
        }
    }

    fn join(&self, conn: &mut ConnectionContext, code: RoomCode, role: Role, outbox: &mut Outbox) -> Flow {
        let id = conn.id();
        let peer = match self.registry.with_room(&code, |room| room.try_bind(role, id)) {
            Ok(peer) => peer,
            Err(RoomFull) => {
                info!("Room {} is full, rejecting {} as {}", code, id, role);
                outbox.push((id, Outbound::Signal(SignalMessage::room_full(code))));
                outbox.push((id, Outbound::Close));
                return Flow::Close;
            }
        };

        let previous = conn.binding().map(|(room, role)| (room.clone(), role));
        if let Some((old_code, old_role)) = previous {
            if old_code != code || old_role != role {
                debug!("{} moves from {}/{} to {}/{}", id, old_code, old_role, code, role);
                self.vacate(id, &old_code, old_role, outbox);
            }
        }

        conn.bind(code.clone(), role);
        info!("{} joined room {} as {}", id, code, role);
        outbox.push((id, Outbound::Signal(SignalMessage::joined_room(code.clone(), role))));

        if let Some(peer) = peer {
            outbox.push((
                id,
                Outbound::Signal(SignalMessage::peer_joined(code.clone(), PeerRef::Myself)),
            ));
            outbox.push((
                peer,
                Outbound::Signal(SignalMessage::peer_joined(code, PeerRef::Peer(role))),
            ));
        }
        Flow::Continue
    }

    fn forward(
        &self,
        conn: &ConnectionContext,
        code: RoomCode,
        message: SignalMessage,
        outbox: &mut Outbox,
    ) -> Result<(), ProtocolError> {
        let role = match conn.binding() {
            Some((bound, role)) if *bound == code => role,
            _ => return Err(ProtocolError::NotJoined),
        };

        match self.registry.peer_of(&code, role) {
            Some(peer) if peer != conn.id() => {
                debug!("Relaying {} in room {} from {} to {}", message.kind, code, role, role.opposite());
                let relayed = SignalMessage::new(message.kind, Some(code), message.payload);
                outbox.push((peer, Outbound::Signal(relayed)));
            }
            _ => debug!("No peer for {} in room {}, dropping {}", role, code, message.kind),
        }
        Ok(())
    }

    fn vacate(&self, id: ConnectionId, code: &RoomCode, role: Role, outbox: &mut Outbox) {
        if let Some(peer) = self.registry.unbind(code, role, id) {
            outbox.push((peer, Outbound::Signal(SignalMessage::peer_left(code.clone(), role))));
        }
        self.registry.release_if_empty(code);
    }

    async fn flush(&self, outbox: Outbox) {
        for (to, outbound) in outbox {
            self.output.deliver(&to, outbound).await;
        }
    }
}
