//! Common utilities shared across the Madinah GIS gateway crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for GIS token acquisition with single-flight renewal
pub mod token_manager;
