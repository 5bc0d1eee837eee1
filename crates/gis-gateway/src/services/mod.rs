//! Service layer for the GIS gateway.
//!
//! This module contains the pieces that talk to the GIS platform and shape
//! its answers for the gRPC layer.
//!
//! # Components
//!
//! - `gis_client` - Authenticated HTTP client for the query endpoints
//! - `endpoints` - Upstream URL construction
//! - `coercion` - JSON object to string map conversion

pub mod coercion;
pub mod endpoints;
pub mod gis_client;

pub use endpoints::GisEndpoints;
pub use gis_client::{GisClient, JsonObject};
