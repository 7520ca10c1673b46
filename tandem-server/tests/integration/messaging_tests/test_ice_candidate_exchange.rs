use tandem_core::{IceCandidate, Role, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, TestServer, room_code};

#[tokio::test]
async fn test_ice_candidates_flow_both_ways_in_order() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let code = room_code("abc123");

    let mut host = server.joined_client("host", &code, Role::Host).await.unwrap();
    let mut guest = server.joined_client("guest", &code, Role::Guest).await.unwrap();
    host.expect_type("peer-joined", SIGNAL_TIMEOUT_MS).await.unwrap();
    guest.expect_type("peer-joined", SIGNAL_TIMEOUT_MS).await.unwrap();

    let host_candidates: Vec<_> = (0..5)
        .map(|i| {
            IceCandidate {
                sdp_mid: Some("0".to_string()),
                sdp_m_line_index: Some(0),
                ..IceCandidate::new(format!(
                    "candidate:{} 1 udp 2122260223 192.168.1.2 5{:04} typ host",
                    i, i
                ))
            }
        })
        .collect();
    for candidate in &host_candidates {
        host.send_signal(&SignalMessage::ice_candidate(code.clone(), candidate))
            .await
            .unwrap();
    }

    for expected in &host_candidates {
        let frame = guest.expect_type("ice-candidate", SIGNAL_TIMEOUT_MS).await.unwrap();
        let received: IceCandidate = serde_json::from_value(frame["payload"].clone()).unwrap();
        assert_eq!(&received, expected);
    }

    let guest_candidate = IceCandidate {
        sdp_m_line_index: Some(0),
        ..IceCandidate::new("candidate:9 1 udp 1 10.0.0.9 9 typ host")
    };
    guest
        .send_signal(&SignalMessage::ice_candidate(code, &guest_candidate))
        .await
        .unwrap();
    let frame = host.expect_type("ice-candidate", SIGNAL_TIMEOUT_MS).await.unwrap();
    assert_eq!(frame["payload"]["candidate"], guest_candidate.candidate);
    assert_eq!(frame["payload"]["sdpMLineIndex"], 0);

    host.close().await.unwrap();
    guest.close().await.unwrap();
}
