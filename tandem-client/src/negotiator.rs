use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::future::{self, Either, LocalBoxFuture};
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;
use tandem_core::{
    ErrorPayload, IceCandidate, Role, RoomCode, SessionDescription, SignalKind, SignalMessage,
};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::engine::{
    EngineEvent, EngineEventSink, Epoch, LocalStream, MediaSource, PeerConnection,
    PeerConnectionFactory, RemoteStream, SignalTransport, TransportConnector, TransportEvent,
    TransportEventSink,
};
use crate::error::{EngineError, MediaError, SessionError};
use crate::status::ConnectionStatus;

/// Shown when a manual rejoin could not get back to waiting for a peer.
pub const REJOIN_FAILED: &str = "could not rejoin. please refresh and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    Idle,
    AcquiringMedia,
    AwaitingPeer,
    Negotiating,
    Connected,
    Disconnected,
    Retrying,
    RoomFull,
    MediaUnavailable,
    InvalidRoom,
}

impl SessionState {
    /// States only a rejoin can leave.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::RoomFull | SessionState::MediaUnavailable | SessionState::InvalidRoom
        )
    }
}

/// Everything that can wake the negotiator up.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Engine { epoch: Epoch, event: EngineEvent },
    Transport { epoch: Epoch, event: TransportEvent },
    Rejoin,
    Leave,
}

/// What the page should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SessionUpdate {
    Status {
        status: ConnectionStatus,
        label: &'static str,
    },
    LocalStream {
        stream: LocalStream,
    },
    RemoteStream {
        stream: RemoteStream,
    },
    RoomFull,
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop,
}

/// Lets the page ask a running session to rejoin or leave.
#[derive(Clone)]
pub struct SessionHandle {
    tx: UnboundedSender<SessionInput>,
    teardown: Rc<RefCell<Teardown>>,
}

impl SessionHandle {
    /// Returns `false` once the session has ended.
    pub fn rejoin(&self) -> bool {
        self.tx.unbounded_send(SessionInput::Rejoin).is_ok()
    }

    /// Sends `peer-left`, closes the socket and the peer connection and
    /// stops the camera before returning, then lets the session task clear
    /// its state. Safe to call from a page-unload handler, where the task
    /// will not get to run again.
    pub fn leave(&self) -> bool {
        let queued = self.tx.unbounded_send(SessionInput::Leave).is_ok();
        if queued {
            self.teardown.take().run();
        }
        queued
    }
}

/// What leaving has to release, mirrored from the negotiator as resources
/// come and go.
#[derive(Default)]
struct Teardown {
    farewell: Option<String>,
    transport: Option<Rc<dyn SignalTransport>>,
    peer: Option<Rc<dyn PeerConnection>>,
    release_media: Option<Box<dyn FnOnce()>>,
}

impl Teardown {
    fn run(self) {
        if let Some(transport) = self.transport {
            if let Some(farewell) = &self.farewell {
                if let Err(e) = transport.send(farewell) {
                    debug!("Could not say goodbye: {}", e);
                }
            }
            transport.close();
        }
        if let Some(peer) = self.peer {
            peer.close();
        }
        if let Some(release) = self.release_media {
            release();
        }
    }
}

struct Tagged<T> {
    epoch: Epoch,
    inner: Rc<T>,
}

type StepResult = Result<Option<SignalMessage>, EngineError>;

/// An offer, answer or candidate being applied to the peer connection.
/// Resolves to the frame to send once it is done.
struct InFlight {
    kind: SignalKind,
    peer_epoch: Epoch,
    future: LocalBoxFuture<'static, StepResult>,
}

enum Wake {
    Input(SessionInput),
    Step(StepResult),
}

/// Client side of the room protocol for one browser tab.
///
/// At most one engine step is in flight. Relay frames that would start
/// another one wait behind it in arrival order, while engine events,
/// `peer-left`, `room-full`, transport loss, rejoin and leave are handled
/// immediately. Anything that replaces the peer connection abandons the
/// step, so a stalled engine call never blocks a reset.
pub struct Negotiator<M, F, C>
where
    M: MediaSource + 'static,
    F: PeerConnectionFactory,
    C: TransportConnector,
{
    config: SessionConfig,
    media: Rc<M>,
    factory: F,
    connector: C,
    inputs_tx: UnboundedSender<SessionInput>,
    inputs: UnboundedReceiver<SessionInput>,
    updates: UnboundedSender<SessionUpdate>,
    state: SessionState,
    code: Option<RoomCode>,
    local_stream: Option<LocalStream>,
    peer: Option<Tagged<F::Connection>>,
    transport: Option<Tagged<C::Transport>>,
    in_flight: Option<InFlight>,
    held: VecDeque<SignalMessage>,
    teardown: Rc<RefCell<Teardown>>,
    last_epoch: Epoch,
    has_peer: bool,
}

impl<M, F, C> Negotiator<M, F, C>
where
    M: MediaSource + 'static,
    F: PeerConnectionFactory,
    C: TransportConnector,
{
    pub fn new(
        config: SessionConfig,
        media: M,
        factory: F,
        connector: C,
    ) -> (Self, SessionHandle, UnboundedReceiver<SessionUpdate>) {
        let (inputs_tx, inputs) = mpsc::unbounded();
        let (updates, updates_rx) = mpsc::unbounded();
        let teardown = Rc::new(RefCell::new(Teardown::default()));
        let handle = SessionHandle {
            tx: inputs_tx.clone(),
            teardown: teardown.clone(),
        };
        let negotiator = Self {
            config,
            media: Rc::new(media),
            factory,
            connector,
            inputs_tx,
            inputs,
            updates,
            state: SessionState::Idle,
            code: None,
            local_stream: None,
            peer: None,
            transport: None,
            in_flight: None,
            held: VecDeque::new(),
            teardown,
            last_epoch: 0,
            has_peer: false,
        };
        (negotiator, handle, updates_rx)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> Role {
        self.config.role
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        self.code.as_ref()
    }

    pub fn has_peer(&self) -> bool {
        self.has_peer
    }

    pub fn local_stream(&self) -> Option<&LocalStream> {
        self.local_stream.as_ref()
    }

    /// Starts the session and processes inputs until it is left.
    pub async fn run(mut self) {
        if let Err(e) = self.start().await {
            debug!("Session did not start: {}", e);
        }
        while let Some(wake) = self.next_wake().await {
            if self.wake(wake).await == Step::Stop {
                break;
            }
        }
        info!("Session for room {} ended", self.config.room_code);
    }

    /// Acquires media, prepares a peer connection and connects the
    /// transport. Failures are reported as updates as well as returned.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        self.set_status(ConnectionStatus::Connecting);
        let result = self.start_session().await;
        if let Err(e) = &result {
            warn!("Session start failed: {}", e);
            self.emit(SessionUpdate::Error {
                message: e.to_string(),
            });
            self.set_status(ConnectionStatus::Disconnected);
        }
        result
    }

    /// Handles everything already queued, and any step that can finish
    /// right away, without waiting for more.
    pub async fn process_pending(&mut self) -> Step {
        while let Some(wake) = self.try_wake() {
            if self.wake(wake).await == Step::Stop {
                return Step::Stop;
            }
        }
        Step::Continue
    }

    /// Waits for the in-flight step or the next input, whichever is first.
    async fn next_wake(&mut self) -> Option<Wake> {
        let Some(step) = self.in_flight.as_mut() else {
            return self.inputs.next().await.map(Wake::Input);
        };
        match future::select(&mut step.future, self.inputs.next()).await {
            Either::Left((result, _)) => Some(Wake::Step(result)),
            Either::Right((input, _)) => input.map(Wake::Input),
        }
    }

    fn try_wake(&mut self) -> Option<Wake> {
        if let Some(step) = self.in_flight.as_mut() {
            if let Some(result) = (&mut step.future).now_or_never() {
                return Some(Wake::Step(result));
            }
        }
        self.inputs.try_recv().ok().map(Wake::Input)
    }

    async fn wake(&mut self, wake: Wake) -> Step {
        match wake {
            Wake::Input(input) => self.handle(input).await,
            Wake::Step(result) => {
                self.finish_step(result);
                Step::Continue
            }
        }
    }

    pub async fn handle(&mut self, input: SessionInput) -> Step {
        match input {
            SessionInput::Engine { epoch, event } => {
                if self.peer.as_ref().is_some_and(|peer| peer.epoch == epoch) {
                    self.on_engine_event(event);
                } else {
                    debug!("Dropping {:?} from stale peer connection {}", event, epoch);
                }
            }
            SessionInput::Transport { epoch, event } => {
                if self.transport.as_ref().is_some_and(|t| t.epoch == epoch) {
                    self.on_transport_event(event);
                } else {
                    debug!("Dropping {:?} from stale transport {}", event, epoch);
                }
            }
            SessionInput::Rejoin => self.rejoin().await,
            SessionInput::Leave => {
                self.leave();
                return Step::Stop;
            }
        }
        Step::Continue
    }

    async fn start_session(&mut self) -> Result<(), SessionError> {
        let code = match RoomCode::normalize_input(&self.config.room_code).parse::<RoomCode>() {
            Ok(code) => code,
            Err(_) => {
                self.state = SessionState::InvalidRoom;
                return Err(SessionError::InvalidRoom);
            }
        };
        self.code = Some(code.clone());
        self.teardown.borrow_mut().farewell = SignalMessage::peer_left(code.clone(), self.role())
            .to_json()
            .ok();

        self.state = SessionState::AcquiringMedia;
        if let Err(e) = self.ensure_local_media().await {
            self.state = SessionState::MediaUnavailable;
            return Err(e.into());
        }
        if let Err(e) = self.attach_tracks() {
            self.state = SessionState::Disconnected;
            return Err(e.into());
        }

        let epoch = self.next_epoch();
        let sink = TransportEventSink::new(epoch, self.inputs_tx.clone());
        match self.connector.connect(sink).await {
            Ok(transport) => {
                info!("Connecting to room {} as {}", code, self.role());
                let transport = Rc::new(transport);
                let shared: Rc<dyn SignalTransport> = transport.clone();
                self.teardown.borrow_mut().transport = Some(shared);
                self.transport = Some(Tagged {
                    epoch,
                    inner: transport,
                });
                self.state = SessionState::AwaitingPeer;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                Err(e.into())
            }
        }
    }

    async fn ensure_local_media(&mut self) -> Result<(), MediaError> {
        if self.local_stream.is_some() {
            return Ok(());
        }
        let stream = self.media.acquire(&self.config.media).await?;
        info!("Local media {} ready with {} tracks", stream.id, stream.tracks.len());
        self.emit(SessionUpdate::LocalStream {
            stream: stream.clone(),
        });
        let media = self.media.clone();
        let captured = stream.clone();
        self.teardown.borrow_mut().release_media = Some(Box::new(move || media.release(&captured)));
        self.local_stream = Some(stream);
        Ok(())
    }

    /// Makes sure a peer connection exists and carries every local track.
    fn attach_tracks(&mut self) -> Result<(), EngineError> {
        if self.peer.is_none() {
            let epoch = self.next_epoch();
            let sink = EngineEventSink::new(epoch, self.inputs_tx.clone());
            let connection = self.factory.create(&self.config.ice_servers, sink)?;
            debug!("Created peer connection {}", epoch);
            let connection = Rc::new(connection);
            let shared: Rc<dyn PeerConnection> = connection.clone();
            self.teardown.borrow_mut().peer = Some(shared);
            self.peer = Some(Tagged {
                epoch,
                inner: connection,
            });
        }

        if let (Some(peer), Some(stream)) = (&self.peer, &self.local_stream) {
            let attached = peer.inner.sender_track_ids();
            for track in stream.tracks.iter().filter(|track| !attached.contains(&track.id)) {
                peer.inner.add_track(track, stream)?;
            }
        }
        Ok(())
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                if let Some(code) = self.code.clone() {
                    self.send(SignalMessage::join_room(code, self.role()));
                }
            }
            TransportEvent::Message(text) => match SignalMessage::from_json(&text) {
                Ok(message) => self.on_signal(message),
                Err(e) => warn!("Ignoring malformed frame from relay: {}", e),
            },
            TransportEvent::Closed => self.on_transport_lost("closed"),
            TransportEvent::Error(reason) => self.on_transport_lost(&reason),
        }
    }

    fn on_transport_lost(&mut self, reason: &str) {
        info!("Signaling transport lost: {}", reason);
        self.abandon_step();
        self.transport = None;
        self.teardown.borrow_mut().transport = None;
        self.has_peer = false;
        if !self.state.is_terminal() {
            self.state = SessionState::Disconnected;
        }
        self.set_status(ConnectionStatus::Disconnected);
    }

    fn on_signal(&mut self, message: SignalMessage) {
        if self.in_flight.is_some() && waits_for_step(message.kind) {
            debug!("Holding {} until the current step finishes", message.kind);
            self.held.push_back(message);
            return;
        }
        debug!("Relay sent {}", message.kind);
        match message.kind {
            SignalKind::JoinedRoom => {
                self.state = SessionState::AwaitingPeer;
                if self.role() == Role::Guest {
                    self.set_status(ConnectionStatus::Connecting);
                }
            }
            SignalKind::PeerJoined => {
                self.has_peer = true;
                self.set_status(ConnectionStatus::Connecting);
                if let Err(e) = self.send_offer() {
                    self.report(e);
                }
            }
            SignalKind::Offer => {
                self.has_peer = true;
                if let Err(e) = self.answer_offer(&message) {
                    self.report(e);
                }
            }
            SignalKind::Answer => {
                if let Err(e) = self.accept_answer(&message) {
                    self.report(e);
                }
            }
            SignalKind::IceCandidate => self.add_remote_candidate(&message),
            SignalKind::PeerLeft => self.on_peer_left(),
            SignalKind::RoomFull => {
                info!("Room is full");
                self.state = SessionState::RoomFull;
                self.has_peer = false;
                self.close_transport();
                self.close_peer();
                self.emit(SessionUpdate::RoomFull);
            }
            SignalKind::Error => {
                let text = message
                    .payload_as::<ErrorPayload>()
                    .map(|payload| payload.message)
                    .unwrap_or_else(|_| "signaling error.".to_string());
                warn!("Relay reported: {}", text);
                self.emit(SessionUpdate::Error { message: text });
            }
            SignalKind::JoinRoom => debug!("Ignoring unexpected {} from relay", message.kind),
        }
    }

    /// Only the host offers, and only once it knows a guest is there.
    fn send_offer(&mut self) -> Result<(), EngineError> {
        if self.role() != Role::Host || !self.has_peer {
            return Ok(());
        }
        self.state = SessionState::Negotiating;
        self.attach_tracks()?;

        let (Some(pc), Some(code)) = (self.connection(), self.code.clone()) else {
            return Ok(());
        };
        self.begin_step(SignalKind::Offer, async move {
            let offer = pc.create_offer().await?;
            pc.set_local_description(&offer).await?;
            Ok(Some(SignalMessage::offer(code, &offer)))
        });
        Ok(())
    }

    fn answer_offer(&mut self, message: &SignalMessage) -> Result<(), EngineError> {
        let offer: SessionDescription = message.payload_as()?;
        self.state = SessionState::Negotiating;
        self.attach_tracks()?;

        let (Some(pc), Some(code)) = (self.connection(), self.code.clone()) else {
            return Ok(());
        };
        self.begin_step(SignalKind::Answer, async move {
            pc.set_remote_description(&offer).await?;
            let answer = pc.create_answer().await?;
            pc.set_local_description(&answer).await?;
            Ok(Some(SignalMessage::answer(code, &answer)))
        });
        Ok(())
    }

    fn accept_answer(&mut self, message: &SignalMessage) -> Result<(), EngineError> {
        let Some(pc) = self.connection() else {
            return Ok(());
        };
        let answer: SessionDescription = message.payload_as()?;
        self.begin_step(SignalKind::Answer, async move {
            pc.set_remote_description(&answer).await?;
            Ok(None)
        });
        Ok(())
    }

    fn add_remote_candidate(&mut self, message: &SignalMessage) {
        let Some(pc) = self.connection() else {
            debug!("No peer connection yet, ignoring candidate");
            return;
        };
        let candidate = match message.payload_as::<IceCandidate>() {
            Ok(candidate) => candidate,
            Err(e) => {
                debug!("Ignoring candidate: {}", e);
                return;
            }
        };
        self.begin_step(SignalKind::IceCandidate, async move {
            if let Err(e) = pc.add_ice_candidate(&candidate).await {
                debug!("Ignoring candidate that failed to apply: {}", e);
            }
            Ok(None)
        });
    }

    fn connection(&self) -> Option<Rc<F::Connection>> {
        self.peer.as_ref().map(|peer| peer.inner.clone())
    }

    fn begin_step<Fut>(&mut self, kind: SignalKind, step: Fut)
    where
        Fut: Future<Output = StepResult> + 'static,
    {
        let Some(peer_epoch) = self.peer.as_ref().map(|peer| peer.epoch) else {
            return;
        };
        debug!("Starting {} step on peer connection {}", kind, peer_epoch);
        self.in_flight = Some(InFlight {
            kind,
            peer_epoch,
            future: step.boxed_local(),
        });
    }

    fn finish_step(&mut self, result: StepResult) {
        if let Some(step) = self.in_flight.take() {
            debug!("Finished {} step on peer connection {}", step.kind, step.peer_epoch);
        }
        match result {
            Ok(Some(message)) => self.send(message),
            Ok(None) => {}
            Err(e) => self.report(e),
        }
        while self.in_flight.is_none() {
            let Some(message) = self.held.pop_front() else {
                break;
            };
            self.on_signal(message);
        }
    }

    /// Drops the in-flight step and whatever was waiting behind it.
    fn abandon_step(&mut self) {
        if let Some(step) = self.in_flight.take() {
            info!("Abandoning {} step on peer connection {}", step.kind, step.peer_epoch);
        }
        if !self.held.is_empty() {
            debug!("Dropping {} held frames", self.held.len());
            self.held.clear();
        }
    }

    fn on_peer_left(&mut self) {
        info!("Peer left the room");
        self.has_peer = false;
        self.close_peer();
        self.state = SessionState::AwaitingPeer;
        if let Err(e) = self.attach_tracks() {
            self.report(e);
        }
        let status = match self.role() {
            Role::Host => ConnectionStatus::Connecting,
            Role::Guest => ConnectionStatus::Disconnected,
        };
        self.set_status(status);
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::IceCandidate(candidate) => {
                if let Some(code) = self.code.clone() {
                    self.send(SignalMessage::ice_candidate(code, &candidate));
                }
            }
            EngineEvent::ConnectionState(state) => {
                if let Some(status) = ConnectionStatus::from_peer_state(state) {
                    self.apply_peer_status(status);
                }
            }
            EngineEvent::IceConnectionState(state) => {
                if let Some(status) = ConnectionStatus::from_ice_state(state) {
                    self.apply_peer_status(status);
                }
            }
            EngineEvent::RemoteStream(stream) => {
                info!("Remote stream {} arrived", stream.id);
                self.emit(SessionUpdate::RemoteStream { stream });
            }
        }
    }

    fn apply_peer_status(&mut self, status: ConnectionStatus) {
        match status {
            ConnectionStatus::Connected => self.state = SessionState::Connected,
            ConnectionStatus::Disconnected if self.state == SessionState::Connected => {
                self.state = SessionState::Disconnected;
            }
            _ => {}
        }
        self.set_status(status);
    }

    /// Tears everything down and starts over from the transport connect.
    ///
    /// The old transport's close event carries a stale epoch and is dropped,
    /// so the forced close never downgrades the status.
    async fn rejoin(&mut self) {
        info!("Rejoining room {}", self.config.room_code);
        self.state = SessionState::Retrying;
        self.set_status(ConnectionStatus::Connecting);
        self.has_peer = false;
        self.close_peer();
        self.close_transport();

        if let Err(e) = self.start_session().await {
            warn!("Rejoin failed: {}", e);
            let message = match e {
                SessionError::InvalidRoom => e.to_string(),
                _ => REJOIN_FAILED.to_string(),
            };
            self.emit(SessionUpdate::Error { message });
            self.set_status(ConnectionStatus::Disconnected);
        }
    }

    /// Page teardown. The handle has usually released everything already;
    /// whatever it has not is released here.
    fn leave(&mut self) {
        self.abandon_step();
        self.teardown.take().run();
        self.transport = None;
        self.peer = None;
        self.local_stream = None;
        self.has_peer = false;
        self.state = SessionState::Idle;
        info!("Left room {}", self.config.room_code);
    }

    fn close_peer(&mut self) {
        self.abandon_step();
        self.teardown.borrow_mut().peer = None;
        if let Some(peer) = self.peer.take() {
            debug!("Closing peer connection {}", peer.epoch);
            peer.inner.close();
        }
    }

    fn close_transport(&mut self) {
        self.teardown.borrow_mut().transport = None;
        if let Some(transport) = self.transport.take() {
            debug!("Closing transport {}", transport.epoch);
            transport.inner.close();
        }
    }

    fn send(&self, message: SignalMessage) {
        let Some(transport) = &self.transport else {
            debug!("No transport, dropping {}", message.kind);
            return;
        };
        match message.to_json() {
            Ok(text) => {
                if let Err(e) = transport.inner.send(&text) {
                    warn!("Failed to send {}: {}", message.kind, e);
                }
            }
            Err(e) => warn!("Failed to serialize {}: {}", message.kind, e),
        }
    }

    fn report(&self, e: EngineError) {
        warn!("Negotiation step failed: {}", e);
        self.emit(SessionUpdate::Error {
            message: e.to_string(),
        });
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.emit(SessionUpdate::Status {
            status,
            label: status.label(self.role()),
        });
    }

    fn emit(&self, update: SessionUpdate) {
        let _ = self.updates.unbounded_send(update);
    }

    fn next_epoch(&mut self) -> Epoch {
        self.last_epoch += 1;
        self.last_epoch
    }
}

/// Frames that drive the peer connection and so must not overtake a step.
fn waits_for_step(kind: SignalKind) -> bool {
    matches!(
        kind,
        SignalKind::PeerJoined | SignalKind::Offer | SignalKind::Answer | SignalKind::IceCandidate
    )
}
