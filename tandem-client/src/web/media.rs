use async_trait::async_trait;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{DomException, MediaStream, MediaStreamConstraints, MediaStreamTrack};

use crate::config::MediaConstraints;
use crate::engine::{LocalStream, MediaSource, MediaTrack, TrackKind};
use crate::error::MediaError;
use crate::streams::StreamStore;
use crate::web::js_text;

const START_FAILED: &str = "could not start camera/microphone.";

/// Browser `MediaStream` objects by id.
pub type MediaStore = StreamStore<MediaStream>;

/// `navigator.mediaDevices.getUserMedia`.
pub struct BrowserMedia {
    store: MediaStore,
}

impl BrowserMedia {
    pub fn new(store: MediaStore) -> Self {
        Self { store }
    }
}

#[async_trait(?Send)]
impl MediaSource for BrowserMedia {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalStream, MediaError> {
        let window = web_sys::window().ok_or(MediaError::Unsupported)?;
        let navigator = window.navigator();

        let has_devices = js_sys::Reflect::get(&navigator, &"mediaDevices".into())
            .map(|devices| !devices.is_undefined() && !devices.is_null())
            .unwrap_or(false);
        if !has_devices {
            return Err(if window.is_secure_context() {
                MediaError::Unsupported
            } else {
                MediaError::InsecureContext
            });
        }
        let devices = navigator
            .media_devices()
            .map_err(|_| MediaError::Unsupported)?;

        let request = MediaStreamConstraints::new();
        let video = serde_wasm_bindgen::to_value(&constraints.video)
            .map_err(|e| MediaError::Other(e.to_string()))?;
        request.set_video(&video);
        request.set_audio(&JsValue::from_bool(constraints.audio));

        let promise = devices
            .get_user_media_with_constraints(&request)
            .map_err(media_error)?;
        let stream: MediaStream = JsFuture::from(promise)
            .await
            .map_err(media_error)?
            .unchecked_into();

        let tracks = stream
            .get_tracks()
            .iter()
            .map(|track| {
                let track: MediaStreamTrack = track.unchecked_into();
                let kind = if track.kind() == "audio" {
                    TrackKind::Audio
                } else {
                    TrackKind::Video
                };
                MediaTrack {
                    id: track.id(),
                    kind,
                }
            })
            .collect();

        let local = LocalStream {
            id: stream.id(),
            tracks,
        };
        self.store.insert(&local.id, stream);
        Ok(local)
    }

    fn release(&self, stream: &LocalStream) {
        if let Some(media) = self.store.remove(&stream.id) {
            for track in media.get_tracks().iter() {
                track.unchecked_into::<MediaStreamTrack>().stop();
            }
        }
    }
}

fn media_error(err: JsValue) -> MediaError {
    let Some(exception) = err.dyn_ref::<DomException>() else {
        let text = js_text(&err);
        return MediaError::Other(if text.is_empty() { START_FAILED.to_string() } else { text });
    };
    match exception.name().as_str() {
        "NotAllowedError" | "SecurityError" => MediaError::PermissionDenied,
        "NotFoundError" | "OverconstrainedError" => MediaError::NotFound,
        _ if exception.message().is_empty() => MediaError::Other(START_FAILED.to_string()),
        _ => MediaError::Other(exception.message()),
    }
}
