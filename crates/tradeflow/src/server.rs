//! Serving a router until shutdown.

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Bind `bind` and serve `app` until `cancel` fires, then drain in-flight
/// requests.
pub async fn serve(
    name: &str,
    app: Router,
    bind: &str,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {name} on {bind}"))?;
    let addr = listener.local_addr().context("Failed to read local address")?;
    info!(service = name, %addr, "Listening");

    axum::serve(listener, app.layer(TraceLayer::new_for_http()))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .with_context(|| format!("{name} server error"))?;

    info!(service = name, "Stopped");
    Ok(())
}
