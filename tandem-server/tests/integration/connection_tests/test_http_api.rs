use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr};
use tandem_core::RoomCode;
use tandem_server::{AppState, ServerConfig, router};
use tower::ServiceExt;

use crate::integration::init_tracing;

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_create_room_returns_fresh_codes() {
    init_tracing();

    let state = AppState::new(ServerConfig::default());
    let app = router(state.clone());

    let mut codes = Vec::new();
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/create-room")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let code: RoomCode = body["code"].as_str().unwrap().parse().unwrap();
        assert!(code.as_str().bytes().all(|b| RoomCode::ALPHABET.contains(&b)));
        codes.push(code);
    }

    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 3);
    assert_eq!(state.registry.len(), 3);
}

#[tokio::test]
async fn test_create_room_requires_post() {
    init_tracing();

    let app = router(AppState::new(ServerConfig::default()));
    let response = app
        .oneshot(Request::get("/api/create-room").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_network_addresses_prefers_lan_for_localhost() {
    init_tracing();

    let config = ServerConfig {
        lan_addresses: vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))],
        ..ServerConfig::default()
    };
    let app = router(AppState::new(config));

    let response = app
        .oneshot(
            Request::get("/api/network-addresses")
                .header("host", "localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["origin"], "http://localhost:3000");
    assert_eq!(body["suggestedJoinBase"], "http://10.0.0.7:3000");
    assert_eq!(body["lanUrls"][0], "http://10.0.0.7:3000");
}
