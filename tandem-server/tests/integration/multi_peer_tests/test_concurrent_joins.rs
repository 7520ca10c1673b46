use tandem_core::{Role, SignalMessage};
use tandem_server::ConnectionContext;

use crate::integration::init_tracing;
use crate::utils::{create_test_relay, join_frame, room_code};

const CONTENDERS: usize = 16;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_host_joins_have_one_winner() {
    init_tracing();

    let (relay, output) = create_test_relay();
    let code = room_code("abc123");

    let mut tasks = Vec::new();
    for _ in 0..CONTENDERS {
        let relay = relay.clone();
        tasks.push(tokio::spawn(async move {
            let mut conn = ConnectionContext::new();
            relay.handle_text(&mut conn, &join_frame("abc123", "host")).await;
            conn
        }));
    }

    let mut winners = Vec::new();
    let mut losers = Vec::new();
    for task in tasks {
        let conn = task.await.unwrap();
        match conn.binding() {
            Some(_) => winners.push(conn.id()),
            None => losers.push(conn.id()),
        }
    }

    assert_eq!(winners.len(), 1);
    let room = relay.registry().get(&code).unwrap();
    assert_eq!(room.occupant(Role::Host), Some(winners[0]));
    assert_eq!(room.occupant(Role::Guest), None);

    assert_eq!(
        output.signals_for(&winners[0]).await,
        vec![SignalMessage::joined_room(code.clone(), Role::Host)]
    );
    for id in &losers {
        assert_eq!(output.signals_for(id).await, vec![SignalMessage::room_full(code.clone())]);
        assert!(output.was_closed(id).await);
    }
}
