use tandem_client::{ConnectionStatus, SessionState};
use tandem_core::{PeerRef, Role, SdpType, SessionDescription, SignalKind, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::harness::{Harness, code};

#[tokio::test]
async fn test_host_sends_offer_when_guest_arrives() {
    init_tracing();
    let mut h = Harness::joined(Role::Host).await;

    h.receive(SignalMessage::peer_joined(code(), PeerRef::Peer(Role::Guest))).await;

    let sent = h.transport.sent();
    assert_eq!(sent[0].kind, SignalKind::Offer);
    let offer: SessionDescription = sent[0].payload_as().expect("offer payload");
    assert_eq!(offer.kind, SdpType::Offer);
    assert_eq!(h.peers.latest().local, Some(offer));
    assert!(h.negotiator.has_peer());
    assert_eq!(h.negotiator.state(), SessionState::Negotiating);
}

#[tokio::test]
async fn test_offer_is_followed_by_local_candidates() {
    init_tracing();
    let mut h = Harness::joined(Role::Host).await;

    h.receive(SignalMessage::peer_joined(code(), PeerRef::Peer(Role::Guest))).await;
    assert_eq!(h.sent_kinds(), vec![SignalKind::Offer, SignalKind::IceCandidate]);
}

#[tokio::test]
async fn test_host_status_while_negotiating() {
    init_tracing();
    let mut h = Harness::joined(Role::Host).await;

    h.receive(SignalMessage::peer_joined(code(), PeerRef::Peer(Role::Guest))).await;
    assert_eq!(h.take_statuses(), vec![(ConnectionStatus::Connecting, "waiting for phone")]);
}

#[tokio::test]
async fn test_guest_waits_for_the_offer() {
    init_tracing();
    let mut h = Harness::joined(Role::Guest).await;

    h.receive(SignalMessage::peer_joined(code(), PeerRef::Myself)).await;
    assert!(h.transport.sent().is_empty());
    assert!(h.peers.latest().local.is_none());
    assert_eq!(h.negotiator.state(), SessionState::AwaitingPeer);
}

#[tokio::test]
async fn test_host_connects_once_answer_arrives() {
    init_tracing();
    let mut h = Harness::joined(Role::Host).await;
    h.receive(SignalMessage::peer_joined(code(), PeerRef::Peer(Role::Guest))).await;
    h.take_updates();

    let answer = SessionDescription::answer("v=0 answer from guest");
    h.receive(SignalMessage::answer(code(), &answer)).await;

    assert_eq!(h.peers.latest().remote, Some(answer));
    assert_eq!(h.negotiator.state(), SessionState::Connected);
    assert_eq!(h.take_statuses(), vec![(ConnectionStatus::Connected, "phone connected")]);
}
