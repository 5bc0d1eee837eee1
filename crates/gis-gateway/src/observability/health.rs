//! Health endpoints for the GIS gateway.
//!
//! Served on a separate HTTP listener from the gRPC API:
//! - `GET /health` - Liveness probe (is the process running?)
//! - `GET /ready` - Readiness probe (is the gRPC server accepting calls?)
//!
//! Readiness is not tied to Redis or the GIS platform: both degrade into
//! failed RPCs (or an uncached token) rather than an unready gateway.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Readiness flag shared between `main` and the health router.
#[derive(Debug, Default)]
pub struct HealthState {
    ready: AtomicBool,
}

impl HealthState {
    /// Create a new health state (not ready).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the gateway as serving gRPC traffic.
    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Mark the gateway as not ready (during shutdown).
    pub fn set_not_ready(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    /// Check if the gateway is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Create the health router.
///
/// # Endpoints
///
/// - `GET /health` - Always 200 while the process runs
/// - `GET /ready` - 200 once serving, 503 before startup completes and during shutdown
pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .with_state(health_state)
}

async fn liveness_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthState>>) -> (StatusCode, &'static str) {
    if state.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}
