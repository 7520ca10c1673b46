use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;
use crate::model::{IceCandidate, PeerRef, Role, RoomCode, SessionDescription};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    JoinRoom,
    JoinedRoom,
    PeerJoined,
    Offer,
    Answer,
    IceCandidate,
    PeerLeft,
    RoomFull,
    Error,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::JoinRoom => "join-room",
            SignalKind::JoinedRoom => "joined-room",
            SignalKind::PeerJoined => "peer-joined",
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
            SignalKind::PeerLeft => "peer-left",
            SignalKind::RoomFull => "room-full",
            SignalKind::Error => "error",
        }
    }

    /// Kinds a bound client may send for delivery to the other slot.
    pub fn is_relayed(self) -> bool {
        matches!(
            self,
            SignalKind::Offer | SignalKind::Answer | SignalKind::IceCandidate | SignalKind::PeerLeft
        )
    }
}

impl FromStr for SignalKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "join-room" => SignalKind::JoinRoom,
            "joined-room" => SignalKind::JoinedRoom,
            "peer-joined" => SignalKind::PeerJoined,
            "offer" => SignalKind::Offer,
            "answer" => SignalKind::Answer,
            "ice-candidate" => SignalKind::IceCandidate,
            "peer-left" => SignalKind::PeerLeft,
            "room-full" => SignalKind::RoomFull,
            "error" => SignalKind::Error,
            other => return Err(ProtocolError::UnknownType(other.to_string())),
        };
        Ok(kind)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePayload {
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerJoinedPayload {
    pub role: PeerRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// One `{ type, roomCode, payload }` frame.
///
/// `payload` is kept as raw JSON so the relay can forward offers, answers and
/// candidates verbatim without understanding them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalMessage {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    #[serde(rename = "roomCode", skip_serializing_if = "Option::is_none")]
    pub room_code: Option<RoomCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

#[derive(Deserialize)]
struct RawSignal {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "roomCode")]
    room_code: Option<Value>,
    payload: Option<Value>,
}

impl SignalMessage {
    pub fn new(kind: SignalKind, room_code: Option<RoomCode>, payload: Option<Value>) -> Self {
        Self {
            kind,
            room_code,
            payload,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawSignal = serde_json::from_str(text).map_err(|_| ProtocolError::InvalidJson)?;
        Self::from_raw(raw)
    }

    /// Parses a frame sent by a client, where `roomCode` is mandatory.
    ///
    /// Presence of both `type` and `roomCode` is checked before the type is
    /// classified, so `{"type":"shout"}` is a missing field rather than an
    /// unknown type.
    pub fn from_client_json(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawSignal = serde_json::from_str(text).map_err(|_| ProtocolError::InvalidJson)?;
        let has_code = match &raw.room_code {
            None | Some(Value::Null) => false,
            Some(Value::String(code)) => !code.is_empty(),
            Some(_) => true,
        };
        if !has_code {
            return Err(ProtocolError::MissingField);
        }
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSignal) -> Result<Self, ProtocolError> {
        let kind = match raw.kind.as_deref() {
            Some(kind) if !kind.is_empty() => kind.parse::<SignalKind>()?,
            _ => return Err(ProtocolError::MissingField),
        };

        let room_code = match raw.room_code {
            None | Some(Value::Null) => None,
            Some(Value::String(code)) => Some(code.parse()?),
            Some(other) => Some(other.to_string().parse()?),
        };

        Ok(Self {
            kind,
            room_code,
            payload: raw.payload,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn join_room(code: RoomCode, role: Role) -> Self {
        Self::with_payload(SignalKind::JoinRoom, Some(code), &RolePayload { role })
    }

    pub fn joined_room(code: RoomCode, role: Role) -> Self {
        Self::with_payload(SignalKind::JoinedRoom, Some(code), &RolePayload { role })
    }

    pub fn peer_joined(code: RoomCode, role: PeerRef) -> Self {
        Self::with_payload(SignalKind::PeerJoined, Some(code), &PeerJoinedPayload { role })
    }

    pub fn peer_left(code: RoomCode, role: Role) -> Self {
        Self::with_payload(SignalKind::PeerLeft, Some(code), &RolePayload { role })
    }

    pub fn room_full(code: RoomCode) -> Self {
        Self::new(
            SignalKind::RoomFull,
            Some(code),
            Some(Value::Object(Default::default())),
        )
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_payload(
            SignalKind::Error,
            None,
            &ErrorPayload {
                message: message.into(),
            },
        )
    }

    pub fn offer(code: RoomCode, desc: &SessionDescription) -> Self {
        Self::with_payload(SignalKind::Offer, Some(code), desc)
    }

    pub fn answer(code: RoomCode, desc: &SessionDescription) -> Self {
        Self::with_payload(SignalKind::Answer, Some(code), desc)
    }

    pub fn ice_candidate(code: RoomCode, candidate: &IceCandidate) -> Self {
        Self::with_payload(SignalKind::IceCandidate, Some(code), candidate)
    }

    fn with_payload<P: Serialize>(kind: SignalKind, room_code: Option<RoomCode>, payload: &P) -> Self {
        Self::new(kind, room_code, serde_json::to_value(payload).ok())
    }

    /// The role requested by a `join-room` frame.
    pub fn requested_role(&self) -> Result<Role, ProtocolError> {
        self.payload
            .as_ref()
            .and_then(|payload| payload.get("role"))
            .and_then(Value::as_str)
            .ok_or(ProtocolError::InvalidRole)?
            .parse()
    }

    /// Decodes the payload into a typed body.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        let payload = self.payload.clone().unwrap_or(Value::Null);
        serde_json::from_value(payload).map_err(|_| ProtocolError::MalformedPayload(self.kind.as_str()))
    }
}
