use futures::channel::mpsc::UnboundedReceiver;
use tandem_client::{
    ConnectionStatus, Negotiator, SessionConfig, SessionHandle, SessionUpdate, Step,
};
use tandem_core::{Role, RoomCode, SignalKind, SignalMessage};

use super::mocks::{MockConnector, MockMedia, MockPeerFactory};

pub const CODE: &str = "abc123";

pub type MockNegotiator = Negotiator<MockMedia, MockPeerFactory, MockConnector>;

pub fn code() -> RoomCode {
    CODE.parse().expect("valid room code")
}

/// A negotiator wired to mocks, driven one queue drain at a time.
pub struct Harness {
    pub negotiator: MockNegotiator,
    pub handle: SessionHandle,
    pub updates: UnboundedReceiver<SessionUpdate>,
    pub media: MockMedia,
    pub peers: MockPeerFactory,
    pub transport: MockConnector,
}

impl Harness {
    pub fn new(role: Role) -> Self {
        Self::build(CODE, role, MockMedia::new())
    }

    pub fn build(room_code: &str, role: Role, media: MockMedia) -> Self {
        let peers = MockPeerFactory::new();
        let transport = MockConnector::new();
        let (negotiator, handle, updates) = Negotiator::new(
            SessionConfig::new(room_code, role),
            media.clone(),
            peers.clone(),
            transport.clone(),
        );
        Self {
            negotiator,
            handle,
            updates,
            media,
            peers,
            transport,
        }
    }

    /// Started and joined, with the startup updates and frames discarded.
    pub async fn joined(role: Role) -> Self {
        let mut harness = Self::new(role);
        harness.negotiator.start().await.expect("session starts");
        harness.settle().await;
        harness.receive(SignalMessage::joined_room(code(), role)).await;
        harness.take_updates();
        harness.transport.clear_sent();
        harness
    }

    pub async fn settle(&mut self) -> Step {
        self.negotiator.process_pending().await
    }

    pub async fn receive(&mut self, message: SignalMessage) -> Step {
        self.transport.deliver(message);
        self.settle().await
    }

    pub fn take_updates(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            updates.push(update);
        }
        updates
    }

    pub fn take_statuses(&mut self) -> Vec<(ConnectionStatus, &'static str)> {
        self.take_updates()
            .into_iter()
            .filter_map(|update| match update {
                SessionUpdate::Status { status, label } => Some((status, label)),
                _ => None,
            })
            .collect()
    }

    pub fn sent_kinds(&self) -> Vec<SignalKind> {
        self.transport.sent().iter().map(|message| message.kind).collect()
    }
}
