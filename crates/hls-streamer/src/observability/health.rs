//! Health endpoints for the HLS streamer.
//!
//! Served on the HLS port next to `/hls_stream`:
//! - `GET /health` - Liveness probe (is the process running?)
//! - `GET /ready` - Readiness probe (is a transcoder running?)
//!
//! Note: `/metrics` lives on its own port, see [`crate::routes::metrics_routes`].
//!
//! # Health State
//!
//! The `HealthState` tracks:
//! - `live`: Always true after startup (process is running)
//! - `transcoding`: True between a successful launch and the transcoder's
//!   exit or the start of shutdown
//!
//! The process stays up after the transcoder exits, reporting not ready, so
//! the orchestrator owns the restart decision.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Liveness and readiness for one streamer instance.
#[derive(Debug)]
pub struct HealthState {
    /// Set at construction; the streamer never reports itself dead.
    live: AtomicBool,
    /// Whether the supervised transcoder is running.
    transcoding: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (live=true, ready=false).
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: AtomicBool::new(true),
            transcoding: AtomicBool::new(false),
        }
    }

    /// Mark the transcoder as running. Called once the launch succeeded.
    pub fn set_ready(&self) {
        self.transcoding.store(true, Ordering::SeqCst);
    }

    /// Mark the transcoder as gone (exited, or shutdown has begun).
    pub fn set_not_ready(&self) {
        self.transcoding.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.transcoding.load(Ordering::SeqCst)
    }
}

/// Create the health router with liveness and readiness endpoints.
///
/// # Endpoints
///
/// - `GET /health` - Returns 200 while the process is running
/// - `GET /ready` - Returns 200 while a transcoder is running, 503 otherwise
pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .with_state(health_state)
}

async fn liveness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_live() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn readiness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
