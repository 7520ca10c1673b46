use async_trait::async_trait;
use tandem_core::{IceCandidate, IceServerConfig, SdpType, SessionDescription};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    MediaStream, RtcConfiguration, RtcIceCandidateInit, RtcIceConnectionState, RtcIceServer,
    RtcPeerConnection, RtcPeerConnectionIceEvent, RtcPeerConnectionState, RtcRtpSender,
    RtcSdpType, RtcSessionDescriptionInit, RtcTrackEvent,
};

use crate::engine::{
    EngineEvent, EngineEventSink, Epoch, IceConnectionState, LocalStream, MediaTrack, PeerConnection,
    PeerConnectionFactory, PeerConnectionState, RemoteStream,
};
use crate::error::EngineError;
use crate::web::{MediaStore, js_text};

pub struct BrowserPeerFactory {
    store: MediaStore,
}

impl BrowserPeerFactory {
    pub fn new(store: MediaStore) -> Self {
        Self { store }
    }
}

impl PeerConnectionFactory for BrowserPeerFactory {
    type Connection = BrowserPeer;

    fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: EngineEventSink,
    ) -> Result<BrowserPeer, EngineError> {
        BrowserPeer::new(ice_servers, events, self.store.clone())
    }
}

/// An `RTCPeerConnection` whose handlers live exactly as long as it does.
pub struct BrowserPeer {
    pc: RtcPeerConnection,
    epoch: Epoch,
    store: MediaStore,
    _on_ice: Closure<dyn FnMut(RtcPeerConnectionIceEvent)>,
    _on_state: Closure<dyn FnMut(JsValue)>,
    _on_ice_state: Closure<dyn FnMut(JsValue)>,
    _on_track: Closure<dyn FnMut(RtcTrackEvent)>,
}

impl BrowserPeer {
    fn new(
        ice_servers: &[IceServerConfig],
        events: EngineEventSink,
        store: MediaStore,
    ) -> Result<Self, EngineError> {
        let rtc_config = RtcConfiguration::new();
        let ice_servers_arr = js_sys::Array::new();
        for server_config in ice_servers {
            let rtc_ice_server = RtcIceServer::new();

            let urls = js_sys::Array::new();
            for url in &server_config.urls {
                urls.push(&JsValue::from_str(url));
            }
            rtc_ice_server.set_urls(&urls);

            if let Some(username) = &server_config.username {
                rtc_ice_server.set_username(username);
            }
            if let Some(credential) = &server_config.credential {
                rtc_ice_server.set_credential(credential);
            }

            ice_servers_arr.push(&rtc_ice_server);
        }
        rtc_config.set_ice_servers(&ice_servers_arr);

        let pc = RtcPeerConnection::new_with_configuration(&rtc_config)
            .map_err(|e| EngineError::Create(js_text(&e)))?;

        let on_ice = {
            let events = events.clone();
            Closure::wrap(Box::new(move |ev: RtcPeerConnectionIceEvent| {
                if let Some(candidate) = ev.candidate() {
                    events.emit(EngineEvent::IceCandidate(IceCandidate {
                        candidate: candidate.candidate(),
                        sdp_mid: candidate.sdp_mid(),
                        sdp_m_line_index: candidate.sdp_m_line_index(),
                        username_fragment: None,
                    }));
                }
            }) as Box<dyn FnMut(RtcPeerConnectionIceEvent)>)
        };
        pc.set_onicecandidate(Some(on_ice.as_ref().unchecked_ref()));

        let on_state = {
            let events = events.clone();
            let pc = pc.clone();
            Closure::wrap(Box::new(move |_: JsValue| {
                if let Some(state) = peer_state(pc.connection_state()) {
                    events.emit(EngineEvent::ConnectionState(state));
                }
            }) as Box<dyn FnMut(JsValue)>)
        };
        pc.set_onconnectionstatechange(Some(on_state.as_ref().unchecked_ref()));

        let on_ice_state = {
            let events = events.clone();
            let pc = pc.clone();
            Closure::wrap(Box::new(move |_: JsValue| {
                if let Some(state) = ice_state(pc.ice_connection_state()) {
                    events.emit(EngineEvent::IceConnectionState(state));
                }
            }) as Box<dyn FnMut(JsValue)>)
        };
        pc.set_oniceconnectionstatechange(Some(on_ice_state.as_ref().unchecked_ref()));

        let epoch = events.epoch();
        let on_track = {
            let store = store.clone();
            Closure::wrap(Box::new(move |ev: RtcTrackEvent| {
                if let Ok(stream) = ev.streams().get(0).dyn_into::<MediaStream>() {
                    let id = stream.id();
                    store.insert_remote(epoch, &id, stream);
                    events.emit(EngineEvent::RemoteStream(RemoteStream { id }));
                }
            }) as Box<dyn FnMut(RtcTrackEvent)>)
        };
        pc.set_ontrack(Some(on_track.as_ref().unchecked_ref()));

        Ok(Self {
            pc,
            epoch,
            store,
            _on_ice: on_ice,
            _on_state: on_state,
            _on_ice_state: on_ice_state,
            _on_track: on_track,
        })
    }

    async fn apply(
        &self,
        operation: &'static str,
        promise: js_sys::Promise,
    ) -> Result<JsValue, EngineError> {
        JsFuture::from(promise)
            .await
            .map_err(|e| EngineError::operation(operation, js_text(&e)))
    }
}

#[async_trait(?Send)]
impl PeerConnection for BrowserPeer {
    fn add_track(&self, track: &MediaTrack, stream: &LocalStream) -> Result<(), EngineError> {
        let media = self
            .store
            .get(&stream.id)
            .ok_or_else(|| EngineError::operation("addTrack", "local stream was released"))?;
        let media_track = media
            .get_track_by_id(&track.id)
            .ok_or_else(|| EngineError::operation("addTrack", format!("no track {}", track.id)))?;
        self.pc.add_track_0(&media_track, &media);
        Ok(())
    }

    fn sender_track_ids(&self) -> Vec<String> {
        self.pc
            .get_senders()
            .iter()
            .filter_map(|sender| sender.unchecked_into::<RtcRtpSender>().track())
            .map(|track| track.id())
            .collect()
    }

    async fn create_offer(&self) -> Result<SessionDescription, EngineError> {
        let offer = self.apply("createOffer", self.pc.create_offer()).await?;
        Ok(SessionDescription::offer(sdp_of(&offer)?))
    }

    async fn create_answer(&self) -> Result<SessionDescription, EngineError> {
        let answer = self.apply("createAnswer", self.pc.create_answer()).await?;
        Ok(SessionDescription::answer(sdp_of(&answer)?))
    }

    async fn set_local_description(&self, desc: &SessionDescription) -> Result<(), EngineError> {
        let init = description_init(desc);
        self.apply("setLocalDescription", self.pc.set_local_description(&init))
            .await
            .map(drop)
    }

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<(), EngineError> {
        let init = description_init(desc);
        self.apply("setRemoteDescription", self.pc.set_remote_description(&init))
            .await
            .map(drop)
    }

    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<(), EngineError> {
        let init = RtcIceCandidateInit::new(&candidate.candidate);
        if let Some(mid) = &candidate.sdp_mid {
            init.set_sdp_mid(Some(mid));
        }
        if let Some(idx) = candidate.sdp_m_line_index {
            init.set_sdp_m_line_index(Some(idx));
        }
        let promise = self
            .pc
            .add_ice_candidate_with_opt_rtc_ice_candidate_init(Some(&init));
        self.apply("addIceCandidate", promise).await.map(drop)
    }

    fn close(&self) {
        self.pc.set_onicecandidate(None);
        self.pc.set_ontrack(None);
        self.pc.set_onconnectionstatechange(None);
        self.pc.set_oniceconnectionstatechange(None);
        self.pc.close();
        self.store.remove_remote(self.epoch);
    }
}

fn sdp_of(description: &JsValue) -> Result<String, EngineError> {
    js_sys::Reflect::get(description, &"sdp".into())
        .ok()
        .and_then(|sdp| sdp.as_string())
        .ok_or_else(|| EngineError::operation("readDescription", "description has no sdp"))
}

fn description_init(desc: &SessionDescription) -> RtcSessionDescriptionInit {
    let kind = match desc.kind {
        SdpType::Offer => RtcSdpType::Offer,
        SdpType::Answer => RtcSdpType::Answer,
        SdpType::Pranswer => RtcSdpType::Pranswer,
        SdpType::Rollback => RtcSdpType::Rollback,
    };
    let init = RtcSessionDescriptionInit::new(kind);
    init.set_sdp(&desc.sdp);
    init
}

fn peer_state(state: RtcPeerConnectionState) -> Option<PeerConnectionState> {
    match state {
        RtcPeerConnectionState::New => Some(PeerConnectionState::New),
        RtcPeerConnectionState::Connecting => Some(PeerConnectionState::Connecting),
        RtcPeerConnectionState::Connected => Some(PeerConnectionState::Connected),
        RtcPeerConnectionState::Disconnected => Some(PeerConnectionState::Disconnected),
        RtcPeerConnectionState::Failed => Some(PeerConnectionState::Failed),
        RtcPeerConnectionState::Closed => Some(PeerConnectionState::Closed),
        _ => None,
    }
}

fn ice_state(state: RtcIceConnectionState) -> Option<IceConnectionState> {
    match state {
        RtcIceConnectionState::New => Some(IceConnectionState::New),
        RtcIceConnectionState::Checking => Some(IceConnectionState::Checking),
        RtcIceConnectionState::Connected => Some(IceConnectionState::Connected),
        RtcIceConnectionState::Completed => Some(IceConnectionState::Completed),
        RtcIceConnectionState::Disconnected => Some(IceConnectionState::Disconnected),
        RtcIceConnectionState::Failed => Some(IceConnectionState::Failed),
        RtcIceConnectionState::Closed => Some(IceConnectionState::Closed),
        _ => None,
    }
}
