//! HTTP surface: a route lookup endpoint and a health check.
//!
//! The backend is fully built before [`serve`] is called, so every handler
//! sees an immutable index and the lookup path cannot fail.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::backend::ScheduleBackend;
use crate::metrics::RequestMetrics;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ScheduleBackend>,
    pub metrics: Arc<RequestMetrics>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/schedules/{route}", get(schedules))
        .route("/health", get(health))
        .with_state(state)
}

async fn schedules(State(state): State<AppState>, Path(route): Path<String>) -> Response {
    let started = Instant::now();
    let payload = state.backend.lookup(&route);
    state.metrics.observe(started.elapsed());

    let snapshot = state.metrics.snapshot();
    debug!(
        route = %route,
        requests = snapshot.requests,
        avg_request_micros = snapshot.avg_micros,
        "request served"
    );

    ([(header::CONTENT_TYPE, "application/json")], payload).into_response()
}

async fn health() -> &'static str {
    "OK"
}

/// Binds the listener and serves requests until the process exits.
pub async fn serve(bind: &str, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(
        addr = %listener.local_addr()?,
        backend = state.backend.name(),
        "serving schedules"
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}
