use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

/// Six lower-case characters shared between host and guest.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct RoomCode(String);

impl RoomCode {
    pub const LEN: usize = 6;

    /// Symbols used for generated codes. `i`, `l`, `o`, `0` and `1` are left
    /// out so a code read off a phone screen can't be mistyped.
    pub const ALPHABET: &'static [u8] = b"abcdefghjkmnpqrstuvwxyz23456789";

    /// Builds a code from [`Self::ALPHABET`], asking `pick` for an index
    /// below the given bound once per character.
    pub fn generate(mut pick: impl FnMut(usize) -> usize) -> Self {
        let code = (0..Self::LEN)
            .map(|_| {
                let idx = pick(Self::ALPHABET.len()) % Self::ALPHABET.len();
                Self::ALPHABET[idx] as char
            })
            .collect();
        Self(code)
    }

    /// Landing-page normalization of user input: trimmed, lower-cased,
    /// stripped of anything that isn't alphanumeric, and cut to six.
    ///
    /// The result may still be too short to be a valid code.
    pub fn normalize_input(raw: &str) -> String {
        raw.trim()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .take(Self::LEN)
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        if code.len() != Self::LEN || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ProtocolError::InvalidRoomCode);
        }
        Ok(Self(code))
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RoomCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RoomCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
