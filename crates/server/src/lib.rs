//! # tanya-server
//!
//! The HTTP surface over the `tanya` pipeline: a single `/chat` operation
//! plus health routes, configuration loading, and the background sweep that
//! evicts idle sessions and stale rate-limit windows.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod router;
pub mod state;
pub mod types;

use state::AppState;
use std::time::Duration;
use tracing::info;

/// Serves the application on an already-bound listener.
pub async fn run(listener: tokio::net::TcpListener, app_state: AppState) -> anyhow::Result<()> {
    let sweep_client = app_state.chat_client.clone();
    let sweep_interval = Duration::from_secs(app_state.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await; // the first tick fires immediately
        loop {
            ticker.tick().await;
            sweep_client.sweep_idle_state().await;
        }
    });

    let app = router::create_router(app_state);
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
