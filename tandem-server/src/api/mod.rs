mod network;

pub use network::*;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::RegistryError;
use crate::room::RoomRegistry;
use crate::signaling::{SignalRelay, SignalingService, ws_handler};

/// Everything the HTTP and WebSocket handlers share.
#[derive(Clone)]
pub struct AppState {
    pub registry: RoomRegistry,
    pub relay: Arc<SignalRelay>,
    pub connections: SignalingService,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let registry = RoomRegistry::new();
        let connections = SignalingService::new();
        let relay = Arc::new(SignalRelay::new(registry.clone(), Arc::new(connections.clone())));
        Self {
            registry,
            relay,
            connections,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/create-room", post(create_room))
        .route("/api/network-addresses", get(network_addresses))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct CreatedRoom {
    pub code: String,
}

async fn create_room(State(state): State<AppState>) -> Result<Json<CreatedRoom>, ApiError> {
    let code = state.registry.create_room()?;
    info!("Room {} reserved via API", code);
    Ok(Json(CreatedRoom {
        code: code.to_string(),
    }))
}

async fn network_addresses(State(state): State<AppState>, headers: HeaderMap) -> Json<NetworkAddresses> {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|value| value.to_str().ok());
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok());
    Json(NetworkAddresses::resolve(host, proto, &state.config))
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Registry(RegistryError::CodeSpaceExhausted { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        };
        error!("API request failed: {}", self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
