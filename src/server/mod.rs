//! HTTP/WebSocket front end.
//!
//! - `GET /` upgrades to a WebSocket and runs one [`Session`] per worker.
//! - `GET /stats` renders the contribution statistics page.
//! - `GET /api/stats` returns the same snapshot as JSON.
//!
//! [`Session`]: crate::session::Session

mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use tokio::net::{TcpListener, TcpSocket};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::admission::AdmissionFilter;
use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::scheduler::DispatchCoordinator;
use crate::storage::ResponseSink;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<DispatchCoordinator>,
    pub sink: Arc<dyn ResponseSink>,
    pub filter: AdmissionFilter,
    pub io_timeout: Duration,
    pub ping_interval: Duration,
}

impl AppState {
    pub fn new(
        config: &ServerConfig,
        coordinator: Arc<DispatchCoordinator>,
        sink: Arc<dyn ResponseSink>,
    ) -> Self {
        Self {
            coordinator,
            sink,
            filter: AdmissionFilter::new(config.admission),
            io_timeout: config.io_timeout,
            ping_interval: config.ping_interval(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.coordinator.shutdown_token()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws::ws_handler))
        .route("/stats", get(stats_page_handler))
        .route("/api/stats", get(stats_json_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the coordinator's shutdown token fires.
pub async fn run(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = bind_listener(addr).map_err(|source| ServerError::Bind { addr, source })?;
    serve(listener, state).await
}

/// Listening socket with TCP keep-alive enabled; accepted worker
/// connections inherit it.
pub fn bind_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    keepalive_socket(addr)?.listen(LISTEN_BACKLOG)
}

const LISTEN_BACKLOG: u32 = 1024;

fn keepalive_socket(addr: SocketAddr) -> std::io::Result<TcpSocket> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.set_keepalive(true)?;
    socket.bind(addr)?;
    Ok(socket)
}

/// Serve on an already bound listener. Returns once the pool has drained
/// (or a signal cancelled the token) and in-flight HTTP requests finish.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let shutdown = state.shutdown_token();
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "LLM job server listening");
    }

    let app = router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await?;
    Ok(())
}

async fn stats_page_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(state.coordinator.snapshot().render_html())
}

async fn stats_json_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.coordinator.snapshot())
}
