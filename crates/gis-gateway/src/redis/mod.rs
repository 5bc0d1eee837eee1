//! Redis integration for the GIS gateway.
//!
//! The only shared state is the portal token, cached under a single key so
//! that every gateway instance reuses one token until it expires.
//!
//! # Components
//!
//! - `client` - `RedisTokenStore`, the Redis-backed `TokenStore`

pub mod client;

pub use client::{RedisTokenStore, DEFAULT_OP_TIMEOUT};
