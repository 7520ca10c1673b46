use tandem_client::{ConnectionStatus, SessionState, SessionUpdate};
use tandem_core::{PeerRef, Role, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::harness::{Harness, code};

#[tokio::test]
async fn test_room_full_stops_the_session() {
    init_tracing();
    let mut h = Harness::new(Role::Guest);
    h.negotiator.start().await.expect("session starts");
    h.settle().await;
    h.take_updates();

    h.receive(SignalMessage::room_full(code())).await;

    assert_eq!(h.negotiator.state(), SessionState::RoomFull);
    assert_eq!(h.take_updates(), vec![SessionUpdate::RoomFull]);
    assert_eq!(h.transport.closes(), 1);
    assert!(h.peers.latest().closed);
}

#[tokio::test]
async fn test_nothing_follows_room_full() {
    init_tracing();
    let mut h = Harness::joined(Role::Host).await;
    h.receive(SignalMessage::room_full(code())).await;
    h.take_updates();

    // Late frames on the closed transport are stale.
    h.receive(SignalMessage::peer_joined(code(), PeerRef::Peer(Role::Guest))).await;
    assert!(h.transport.sent().is_empty());
    assert_eq!(h.negotiator.state(), SessionState::RoomFull);
    assert!(
        !h.take_statuses()
            .iter()
            .any(|(status, _)| *status == ConnectionStatus::Disconnected)
    );
}
