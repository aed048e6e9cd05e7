//! Server Implementation
//!
//! HTTP server startup, background task wiring, graceful shutdown.

use std::time::Duration;

use crate::core::{BackgroundTasks, Config, ServerState};
use crate::sweeper::ExpirySweeper;

pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let state = ServerState::initialize(&self.config).await?;

        let mut tasks = BackgroundTasks::new();
        let sweeper = ExpirySweeper::new(
            state.pool().clone(),
            Duration::from_secs(self.config.sweep_interval_secs),
            self.config.reservation_timeout_ms(),
            tasks.shutdown_token(),
        );
        tasks.spawn("expiry_sweeper", sweeper.run());

        let app = crate::api::router(state.clone());

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!("Swap server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down...");
            })
            .await?;

        tasks.shutdown().await;
        Ok(())
    }
}
