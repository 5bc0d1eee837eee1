//! gRPC server reflection.
//!
//! Serves the `grpc.reflection.v1` API from the descriptor set compiled into
//! `proto-gen`, so tools such as `grpcurl` can list and describe
//! `MadinaGisService` without a local copy of the proto.

use crate::errors::GisError;
use tonic_reflection::server::v1::{ServerReflection, ServerReflectionServer};
use tracing::error;

/// Build the reflection service for the gateway's protos.
///
/// # Errors
///
/// Returns `GisError::Internal` if the embedded descriptor set cannot be
/// decoded.
pub fn reflection_service() -> Result<ServerReflectionServer<impl ServerReflection>, GisError> {
    tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(proto_gen::FILE_DESCRIPTOR_SET)
        .build_v1()
        .map_err(|e| {
            error!(
                target: "gis.grpc.reflection",
                error = %e,
                "Failed to build reflection service"
            );
            GisError::Internal(format!("Failed to build reflection service: {e}"))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_set_builds() {
        assert!(reflection_service().is_ok());
    }
}
