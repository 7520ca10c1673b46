use thiserror::Error;

/// Problems with an inbound signaling frame.
///
/// The `Display` text is what the relay sends back in the `error` payload,
/// so keep it short and lower-case like the rest of the protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid json payload.")]
    InvalidJson,

    #[error("missing type or roomcode.")]
    MissingField,

    #[error("invalid room code.")]
    InvalidRoomCode,

    #[error("invalid role.")]
    InvalidRole,

    #[error("join room before signaling.")]
    NotJoined,

    #[error("unknown message type.")]
    UnknownType(String),

    #[error("malformed {0} payload.")]
    MalformedPayload(&'static str),
}
