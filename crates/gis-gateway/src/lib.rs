//! Madinah GIS Gateway Library
//!
//! Exposes a small set of geospatial lookups over gRPC and forwards them to
//! the Madinah GIS platform (ArcGIS portal, map services and the location
//! web service), authenticating every upstream call with a portal token.
//!
//! # Architecture
//!
//! ```text
//! GisService (gRPC, MadinaGisService)
//! └── GisClient (authenticated GET + JSON normalisation)
//!     └── TokenManager (common::token_manager, single-flight renewal)
//!         └── RedisTokenStore (shared token cache, key `madina_gis_token`)
//! ```
//!
//! # Modules
//!
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types and their gRPC status mapping
//! - [`grpc`] - `MadinaGisService` implementation
//! - [`services`] - Upstream client, endpoint URLs, value coercion
//! - [`redis`] - Redis-backed shared token store
//! - [`observability`] - Health endpoints

pub mod config;
pub mod errors;
pub mod grpc;
pub mod observability;
pub mod redis;
pub mod services;
