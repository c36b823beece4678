//! The HTTP boundary: composes the filter, reader, and tailer into the four
//! operations described in the component design — bulk JSON, plain text,
//! the SSE live stream, and the streaming HTML page — plus a couple of
//! ambient routes (`/health`, `/favicon.ico`) that don't carry the auth gate.

pub mod auth;
pub mod bulk;
pub mod html;
pub mod query;
pub mod raw;
pub mod state;
pub mod stream;

use crate::cache::OffsetCache;
use crate::tail::Tailer;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use state::{AppState, SharedState};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_state(log_path: PathBuf, password: String, tailer: Arc<Tailer>) -> SharedState {
    Arc::new(AppState {
        log_path,
        password,
        cache: OffsetCache::new(),
        tailer,
        shell: html::ShellHalves::build(),
    })
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(html::index_page))
        .route("/api/logs", get(bulk::get_logs))
        .route("/api/logs/raw", get(raw::get_logs_raw))
        .route("/api/logs/stream", get(stream::stream_logs))
        .route("/health", get(health))
        .route("/favicon.ico", get(favicon))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}
