// Web server — the admission endpoint in front of the label authority.
//
// One protected route, POST /emit, plus an unauthenticated /health check.
// Every error body has the shape {"error": "<message>"}.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::authority::LabelAuthority;
use crate::config::Config;
use crate::labels::LabelSet;

pub mod auth;
pub mod handlers;

/// Shared application state threaded through all Axum handlers.
///
/// Everything here is read-only after startup, so concurrent requests share
/// it without locking.
#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<dyn LabelAuthority>,
    pub emit_label_key: Arc<str>,
    pub labels: Arc<LabelSet>,
}

impl AppState {
    pub fn new(
        authority: Arc<dyn LabelAuthority>,
        emit_label_key: &str,
        labels: LabelSet,
    ) -> Self {
        Self {
            authority,
            emit_label_key: Arc::from(emit_label_key),
            labels: Arc::new(labels),
        }
    }

    /// Build state from the loaded config and a label authority handle.
    pub fn from_config(config: &Config, authority: Arc<dyn LabelAuthority>) -> Self {
        Self::new(authority, &config.emit_label_key, config.labels.clone())
    }
}

/// Start the Axum server and run until `shutdown` resolves.
pub async fn run_server<F>(state: AppState, bind: &str, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Admission endpoint listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Admission server failed")?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/emit", post(handlers::emit::emit_label))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness check — always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
