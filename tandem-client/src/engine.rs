//! Seams between the negotiator and the platform: camera access, the
//! peer-connection engine and the signaling transport.
//!
//! Implementations never call back into the negotiator directly. They push
//! events into a sink that is stamped with the epoch of the object it was
//! handed to, so events from a torn-down peer connection or transport are
//! recognised and dropped.

use async_trait::async_trait;
use futures::channel::mpsc::UnboundedSender;
use tandem_core::{IceCandidate, IceServerConfig, SessionDescription};

use crate::config::MediaConstraints;
use crate::error::{EngineError, MediaError, TransportError};
use crate::negotiator::SessionInput;

/// Generation counter for peer connections and transports.
pub type Epoch = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
}

/// The local camera/microphone capture, by id. Platform objects stay with
/// the [`MediaSource`] that produced them.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LocalStream {
    pub id: String,
    #[serde(skip)]
    pub tracks: Vec<MediaTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RemoteStream {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    IceCandidate(IceCandidate),
    ConnectionState(PeerConnectionState),
    IceConnectionState(IceConnectionState),
    RemoteStream(RemoteStream),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed,
    Error(String),
}

#[derive(Clone)]
pub struct EngineEventSink {
    epoch: Epoch,
    tx: UnboundedSender<SessionInput>,
}

impl EngineEventSink {
    pub(crate) fn new(epoch: Epoch, tx: UnboundedSender<SessionInput>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.unbounded_send(SessionInput::Engine {
            epoch: self.epoch,
            event,
        });
    }
}

#[derive(Clone)]
pub struct TransportEventSink {
    epoch: Epoch,
    tx: UnboundedSender<SessionInput>,
}

impl TransportEventSink {
    pub(crate) fn new(epoch: Epoch, tx: UnboundedSender<SessionInput>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn emit(&self, event: TransportEvent) {
        let _ = self.tx.unbounded_send(SessionInput::Transport {
            epoch: self.epoch,
            event,
        });
    }
}

#[async_trait(?Send)]
pub trait MediaSource {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalStream, MediaError>;

    /// Stops every track of the stream.
    fn release(&self, stream: &LocalStream);
}

#[async_trait(?Send)]
pub trait PeerConnection {
    fn add_track(&self, track: &MediaTrack, stream: &LocalStream) -> Result<(), EngineError>;

    /// Ids of the tracks already attached through a sender.
    fn sender_track_ids(&self) -> Vec<String>;

    async fn create_offer(&self) -> Result<SessionDescription, EngineError>;
    async fn create_answer(&self) -> Result<SessionDescription, EngineError>;
    async fn set_local_description(&self, desc: &SessionDescription) -> Result<(), EngineError>;
    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<(), EngineError>;
    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<(), EngineError>;

    /// Detaches event handlers, then closes. No event may be emitted after this.
    fn close(&self);
}

pub trait PeerConnectionFactory {
    type Connection: PeerConnection + 'static;

    fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: EngineEventSink,
    ) -> Result<Self::Connection, EngineError>;
}

pub trait SignalTransport {
    fn send(&self, text: &str) -> Result<(), TransportError>;
    fn close(&self);
}

#[async_trait(?Send)]
pub trait TransportConnector {
    type Transport: SignalTransport + 'static;

    /// Starts connecting. [`TransportEvent::Opened`] is emitted once frames
    /// can be sent.
    async fn connect(&self, events: TransportEventSink) -> Result<Self::Transport, TransportError>;
}
