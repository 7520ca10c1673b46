use tandem_core::ProtocolError;
use thiserror::Error;

/// Why the local camera/microphone could not be opened.
///
/// `Display` is the text shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("camera/mic permission was denied.")]
    PermissionDenied,

    #[error("camera/mic not available in this browser.")]
    Unsupported,

    #[error("camera and mic require a secure page (https)")]
    InsecureContext,

    #[error("no camera or microphone was found.")]
    NotFound,

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("could not create peer connection: {0}")]
    Create(String),

    #[error("{operation} failed: {message}")]
    Operation {
        operation: &'static str,
        message: String,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl EngineError {
    pub fn operation(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("could not reach signaling server: {0}")]
    Connect(String),

    #[error("failed to send frame: {0}")]
    Send(String),

    #[error("signaling connection is closed")]
    Closed,
}

/// A session attempt that could not get as far as waiting for a peer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("this room code is invalid.")]
    InvalidRoom,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
