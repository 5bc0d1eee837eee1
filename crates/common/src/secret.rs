//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. The gateway
//! handles three kinds of sensitive values: the GIS account password, the
//! Redis password, and the bearer tokens issued by the GIS portal. All of
//! them are carried as [`SecretString`].
//!
//! `SecretString` implements `Debug` with redaction, so a struct deriving
//! `Debug` around one is safe to hand to `tracing`. The inner value is only
//! reachable through [`ExposeSecret::expose_secret`], which keeps every
//! place a token leaves the process (HTTP headers, query strings, Redis
//! writes) easy to grep for.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct GisAccount {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let account = GisAccount {
//!     username: "gis-reader".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{account:?}").contains("hunter2"));
//! assert_eq!(account.password.expose_secret(), "hunter2");
//! ```

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let token = SecretString::from("gis-bearer-token");
        let debug_str = format!("{token:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("gis-bearer-token"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let secret = SecretString::from("password123");
        assert_eq!(secret.expose_secret(), "password123");
    }

    #[test]
    fn test_struct_with_secret_is_safe() {
        #[allow(dead_code)]
        #[derive(Debug)]
        struct RedisAuth {
            addr: String,
            password: SecretString,
        }

        let auth = RedisAuth {
            addr: "127.0.0.1:6379".to_string(),
            password: SecretString::from("redis-pass"),
        };

        let debug_str = format!("{auth:?}");

        assert!(debug_str.contains("127.0.0.1:6379"));
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("redis-pass"));
    }

    #[test]
    fn test_clone_works() {
        let secret = SecretString::from("cloneable");
        let cloned = secret.clone();
        assert_eq!(cloned.expose_secret(), "cloneable");
    }
}
