//! HTTP listener, CORS, origin policy and graceful shutdown (§4.5, §6).

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use http::Method;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::{Config, Environment};
use crate::gateway::{ws::ws_handler, AppState};
use crate::rest::RestClient;

const LIVEVIEW_PATH: &str = "/liveview";
const DRAIN_WINDOW: Duration = Duration::from_secs(5);

/// Builds the router against `shutdown`, the process-wide root cancellation
/// token. Every subscriber's and controller's token descends from it, so
/// `serve` cancelling it on SIGINT reaches every live stream.
pub fn build_router(config: Arc<Config>, shutdown: CancellationToken) -> Router {
    let state = AppState::new(config.clone(), RestClient::new(), shutdown);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/api/health", get(health))
        .route(LIVEVIEW_PATH, get(ws_handler))
        .with_state(state)
        .layer(cors);

    if config.env == Environment::Development {
        router = router.fallback_service(tower_http::services::ServeDir::new("./public"));
    }

    router
}

async fn health() -> &'static str {
    "ok"
}

/// Binds the configured address and serves `router` until a SIGINT is
/// received. Once the signal arrives, the listener stops accepting new
/// connections and `shutdown` (the same token `router` was built against) is
/// cancelled so every live controller's stream and poller observe it within
/// their own deadlines; the in-flight subscribers then get a 5-second drain
/// window (§4.5 "Shutdown") before this function returns regardless of
/// whether they finished.
pub async fn serve(config: Arc<Config>, router: Router, shutdown: CancellationToken) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.address).await?;
    info!(address = %config.address, "listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::signal::ctrl_c()
        .await
        .expect("failed to install SIGINT handler");
    info!("shutdown requested, refusing new connections and cancelling live controllers");
    let _ = shutdown_tx.send(());
    shutdown.cancel();

    match tokio::time::timeout(DRAIN_WINDOW, server).await {
        Ok(joined) => joined.expect("server task panicked"),
        Err(_) => {
            warn!(drain_seconds = DRAIN_WINDOW.as_secs(), "drain window elapsed before all subscribers finished");
            Ok(())
        }
    }
}
