//! # GIS Gateway Test Utilities
//!
//! Shared test utilities for the GIS gateway.
//!
//! This crate provides mock implementations for isolated gateway testing
//! without a real Redis instance or access to the GIS platform.
//!
//! ## Modules
//!
//! - `mock_token_store` - In-memory shared token cache with TTL and failure injection
//! - `mock_gis` - Fake GIS portal and map services on a local `wiremock` server
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gis_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let upstream = MockGisUpstream::start().await;
//!     upstream.mount_token("token-1", 1).await;
//!
//!     let store = MockTokenStore::new();
//!
//!     // Point the gateway at upstream.token_url() / upstream.map_server_url()...
//!     assert_eq!(store.write_count(), 1);
//! }
//! ```

pub mod mock_gis;
pub mod mock_token_store;

// Re-export commonly used items
pub use mock_gis::*;
pub use mock_token_store::*;
