//! Generated Protocol Buffer code for the Madinah GIS gateway.
//!
//! This crate contains the compiled `proto/gis.proto` definitions: the
//! request/response messages plus the tonic server and client for
//! `MadinaGisService`, and the encoded file descriptor set used to answer
//! gRPC reflection requests.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // Generated code has various doc formatting

// Re-export prost traits for convenience
pub use prost::Message;

// Generated protobuf modules
pub mod gis {
    //! Gateway RPC messages and service stubs
    tonic::include_proto!("madina.gis");
}

/// Encoded `FileDescriptorSet` for `proto/gis.proto`.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("gis_descriptor");
