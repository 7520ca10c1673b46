
use futures::StreamExt;
use futures::channel::mpsc::UnboundedReceiver;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tandem_client::SessionUpdate;
use tandem_core::{Role, RoomCode};
use tandem_server::{AppState, Server, ServerConfig};
use tokio::sync::oneshot;

pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(5);

/// A signaling server on an ephemeral loopback port; stops on drop.
pub struct E2eServer {
    pub addr: SocketAddr,
    pub state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl E2eServer {
    /// Polls until `role` of `code` is bound on the relay.
    pub async fn wait_bound(&self, code: &str, role: Role) {
        let code: RoomCode = code.parse().expect("valid room code");
        tokio::time::timeout(UPDATE_TIMEOUT, async {
            while self.state.registry.peer_of(&code, role).is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("slot was bound");
    }
}

impl Drop for E2eServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn start_server() -> E2eServer {
    let config = ServerConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        lan_addresses: Vec::new(),
    };
    let server = Server::bind(config).await.expect("server binds");
    let addr = server.local_addr().expect("bound address");
    let state = server.state().clone();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = server.run_until(shutdown).await {
            tracing::error!("[e2e server] {:?}", e);
        }
    });
    E2eServer {
        addr,
        state,
        shutdown: Some(shutdown_tx),
    }
}

/// Waits for the first update matching `pred`.
pub async fn wait_for(
    updates: &mut UnboundedReceiver<SessionUpdate>,
    what: &str,
    pred: impl Fn(&SessionUpdate) -> bool,
) -> SessionUpdate {
    let found = tokio::time::timeout(UPDATE_TIMEOUT, async {
        while let Some(update) = updates.next().await {
            if pred(&update) {
                return Some(update);
            }
        }
        None
    })
    .await;
    match found {
        Ok(Some(update)) => update,
        Ok(None) => panic!("session ended before {}", what),
        Err(_) => panic!("timed out waiting for {}", what),
    }
}
