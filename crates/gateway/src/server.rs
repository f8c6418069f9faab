use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        routing::{get, post},
    },
    tracing::info,
};

use crate::{
    routes::{health_handler, link_handler, receive_handler, verify_handler},
    state::AppState,
};

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/webhook", get(verify_handler).post(receive_handler))
        .route("/identity/link", post(link_handler))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, app: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
