//! Observability for the GIS gateway.
//!
//! # Components
//!
//! - `health` - Liveness and readiness endpoints

pub mod health;

pub use health::{health_router, HealthState};
