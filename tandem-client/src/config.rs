use serde::Serialize;
use tandem_core::{IceServerConfig, Role, RoomCode};

/// Everything a session needs to know before it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Room code as typed or taken from the URL; normalized on start.
    pub room_code: String,
    pub role: Role,
    pub ice_servers: Vec<IceServerConfig>,
    pub media: MediaConstraints,
}

impl SessionConfig {
    pub fn new(room_code: impl Into<String>, role: Role) -> Self {
        Self {
            room_code: room_code.into(),
            role,
            ice_servers: vec![IceServerConfig::default()],
            media: MediaConstraints::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ideal<T> {
    pub ideal: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConstraints {
    pub width: Ideal<u32>,
    pub height: Ideal<u32>,
    pub aspect_ratio: Ideal<f64>,
}

/// `getUserMedia` constraints, serialized in the browser's shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MediaConstraints {
    pub video: VideoConstraints,
    pub audio: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: VideoConstraints {
                width: Ideal { ideal: 1920 },
                height: Ideal { ideal: 1080 },
                aspect_ratio: Ideal { ideal: 16.0 / 9.0 },
            },
            audio: true,
        }
    }
}

/// Room code and role extracted from a `/room/<code>?role=guest` page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomLocation {
    pub code: String,
    pub role: Role,
}

impl RoomLocation {
    /// Anything but `role=guest` means host. The code is normalized but not
    /// validated; a short code is reported when the session starts.
    pub fn parse(path: &str, query: &str) -> Self {
        let code = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .nth(1)
            .map(RoomCode::normalize_input)
            .unwrap_or_default();

        let is_guest = query
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "role")
            .is_some_and(|(_, value)| value == "guest");

        Self {
            code,
            role: if is_guest { Role::Guest } else { Role::Host },
        }
    }

    pub fn into_config(self) -> SessionConfig {
        SessionConfig::new(self.code, self.role)
    }
}

/// The link a host shares with the guest device.
pub fn join_url(base: &str, code: &RoomCode) -> String {
    format!("{}/room/{}?role=guest", base.trim_end_matches('/'), code)
}
