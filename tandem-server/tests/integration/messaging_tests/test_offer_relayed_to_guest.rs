use serde_json::json;
use tandem_core::{Role, SessionDescription, SignalKind, SignalMessage};
use tandem_server::ConnectionContext;

use crate::integration::init_tracing;
use crate::utils::{
    SIGNAL_TIMEOUT_MS, SILENCE_WINDOW_MS, TestServer, create_test_relay, join_via_relay, room_code,
    signal_frame,
};

#[tokio::test]
async fn test_offer_reaches_only_the_guest() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let code = room_code("abc123");

    let mut host = server.joined_client("host", &code, Role::Host).await.unwrap();
    let mut guest = server.joined_client("guest", &code, Role::Guest).await.unwrap();
    host.expect_type("peer-joined", SIGNAL_TIMEOUT_MS).await.unwrap();
    guest.expect_type("peer-joined", SIGNAL_TIMEOUT_MS).await.unwrap();

    let offer = SessionDescription::offer("v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\n");
    host.send_signal(&SignalMessage::offer(code.clone(), &offer)).await.unwrap();

    let relayed = guest.expect_type("offer", SIGNAL_TIMEOUT_MS).await.unwrap();
    assert_eq!(relayed["roomCode"], "abc123");
    assert_eq!(relayed["payload"], serde_json::to_value(&offer).unwrap());

    host.expect_silence(SILENCE_WINDOW_MS).await.unwrap();

    let answer = SessionDescription::answer("v=0\r\n");
    guest.send_signal(&SignalMessage::answer(code, &answer)).await.unwrap();
    let relayed = host.expect_type("answer", SIGNAL_TIMEOUT_MS).await.unwrap();
    assert_eq!(relayed["payload"]["sdp"], "v=0\r\n");

    host.close().await.unwrap();
    guest.close().await.unwrap();
}

#[tokio::test]
async fn test_payload_is_forwarded_verbatim() {
    init_tracing();

    let (relay, output) = create_test_relay();
    let mut host = ConnectionContext::new();
    let mut guest = ConnectionContext::new();
    join_via_relay(&relay, &mut host, "abc123", "host").await;
    join_via_relay(&relay, &mut guest, "abc123", "guest").await;
    output.clear().await;

    let payload = json!({"type": "offer", "sdp": "v=0", "x-extra": [1, 2, 3]});
    relay
        .handle_text(&mut host, &signal_frame("offer", " ABC123 ", payload.clone()))
        .await;

    assert_eq!(
        output.signals_for(&guest.id()).await,
        vec![SignalMessage::new(SignalKind::Offer, Some(room_code("abc123")), Some(payload))]
    );
    assert!(output.signals_for(&host.id()).await.is_empty());
}

#[tokio::test]
async fn test_offer_without_peer_is_dropped() {
    init_tracing();

    let (relay, output) = create_test_relay();
    let mut host = ConnectionContext::new();
    join_via_relay(&relay, &mut host, "abc123", "host").await;
    output.clear().await;

    relay
        .handle_text(&mut host, &signal_frame("offer", "abc123", json!({"sdp": "v=0"})))
        .await;

    assert_eq!(output.total().await, 0);
}
