use anyhow::Context;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{AppState, router};
use crate::config::ServerConfig;

/// A bound listener plus the router serving it.
pub struct Server {
    listener: TcpListener,
    app: Router,
    state: AppState,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind signaling server to {}", addr))?;
        let state = AppState::new(config);
        let app = router(state.clone());
        Ok(Self { listener, app, state })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener.local_addr().context("listener has no local address")
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending()).await
    }

    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Signaling server listening on http://{}", self.local_addr()?);
        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("signaling server stopped unexpectedly")
    }
}
