//! GIS gateway error types.
//!
//! Every failure reaches the RPC caller synchronously as a failed call whose
//! message is the error's display text. Nothing is retried internally.
//! Shared-cache failures never show up here: the token manager absorbs them.

use common::token_manager::TokenError;
use thiserror::Error;
use tonic::{Code, Status};

/// GIS gateway error type.
///
/// Maps to gRPC status codes:
/// - `InvalidInput`: `INVALID_ARGUMENT`
/// - `TokenIssuance`, `UpstreamTransport`: `UNAVAILABLE`
/// - everything else: `INTERNAL`
#[derive(Debug, Error)]
pub enum GisError {
    /// A required request field is missing or malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No usable token could be obtained from the GIS portal.
    #[error("Unable to obtain GIS token: {0}")]
    TokenIssuance(String),

    /// Network failure contacting a GIS query endpoint.
    #[error("Upstream transport error: {0}")]
    UpstreamTransport(String),

    /// Upstream body is not a JSON object.
    #[error("Failed to parse upstream response: {0}")]
    ResponseParse(String),

    /// Upstream JSON lacks an expected field or element.
    #[error("Unexpected upstream response shape: {0}")]
    ResponseShape(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redis connection setup failed.
    #[error("Redis error: {0}")]
    Redis(String),

    /// Internal gateway failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GisError {
    /// Returns the gRPC status code for this error.
    #[must_use]
    pub fn code(&self) -> Code {
        match self {
            GisError::InvalidInput(_) => Code::InvalidArgument,
            GisError::TokenIssuance(_) | GisError::UpstreamTransport(_) => Code::Unavailable,
            GisError::ResponseParse(_)
            | GisError::ResponseShape(_)
            | GisError::Config(_)
            | GisError::Redis(_)
            | GisError::Internal(_) => Code::Internal,
        }
    }
}

impl From<TokenError> for GisError {
    fn from(err: TokenError) -> Self {
        GisError::TokenIssuance(err.to_string())
    }
}

impl From<GisError> for Status {
    fn from(err: GisError) -> Self {
        Status::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        assert_eq!(
            GisError::InvalidInput("x".to_string()).code(),
            Code::InvalidArgument
        );
        assert_eq!(
            GisError::TokenIssuance("down".to_string()).code(),
            Code::Unavailable
        );
        assert_eq!(
            GisError::UpstreamTransport("reset".to_string()).code(),
            Code::Unavailable
        );
        assert_eq!(
            GisError::ResponseParse("eof".to_string()).code(),
            Code::Internal
        );
        assert_eq!(
            GisError::ResponseShape("empty".to_string()).code(),
            Code::Internal
        );
        assert_eq!(GisError::Config("bad".to_string()).code(), Code::Internal);
        assert_eq!(GisError::Redis("refused".to_string()).code(), Code::Internal);
        assert_eq!(
            GisError::Internal("client build".to_string()).code(),
            Code::Internal
        );
    }

    #[test]
    fn test_token_error_conversion() {
        let err: GisError = TokenError::IssuanceFailed("no token in response".to_string()).into();

        assert!(matches!(err, GisError::TokenIssuance(_)));
        assert!(err.to_string().contains("no token in response"));
    }

    #[test]
    fn test_status_carries_descriptive_message() {
        let status: Status =
            GisError::InvalidInput("x and y coordinates are required".to_string()).into();

        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(
            status.message(),
            "Invalid input: x and y coordinates are required"
        );
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", GisError::ResponseShape("geometries array is empty".to_string())),
            "Unexpected upstream response shape: geometries array is empty"
        );
        assert_eq!(
            format!("{}", GisError::UpstreamTransport("timeout".to_string())),
            "Upstream transport error: timeout"
        );
    }
}
