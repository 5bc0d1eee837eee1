//! gRPC services for the GIS gateway.
//!
//! Provides the public `MadinaGisService` endpoints and server reflection.

pub mod gis_service;
pub mod reflection;

pub use gis_service::{GisService, LatLon};
pub use reflection::reflection_service;
