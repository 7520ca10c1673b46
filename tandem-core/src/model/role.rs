use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

/// Participant position inside a room.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

impl Role {
    /// The slot a message from this role is relayed to.
    pub fn opposite(self) -> Role {
        match self {
            Role::Host => Role::Guest,
            Role::Guest => Role::Host,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Guest => "guest",
        }
    }

    /// Only the host opens a negotiation.
    pub fn initiates_offer(self) -> bool {
        self == Role::Host
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Role::Host),
            "guest" => Ok(Role::Guest),
            _ => Err(ProtocolError::InvalidRole),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a `peer-joined` notification is about.
///
/// The joiner is told `"self"`; the peer already waiting in the room is told
/// the joiner's role.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum PeerRef {
    Myself,
    Peer(Role),
}

impl PeerRef {
    pub fn as_str(self) -> &'static str {
        match self {
            PeerRef::Myself => "self",
            PeerRef::Peer(role) => role.as_str(),
        }
    }
}

impl Serialize for PeerRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PeerRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "self" => Ok(PeerRef::Myself),
            other => other
                .parse::<Role>()
                .map(PeerRef::Peer)
                .map_err(serde::de::Error::custom),
        }
    }
}
