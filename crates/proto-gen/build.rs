// Build script to compile Protocol Buffer definitions

use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    // Compile protobuf files (messages, server and client stubs) and emit the
    // encoded descriptor set served by gRPC reflection
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(out_dir.join("gis_descriptor.bin"))
        .compile_protos(&["../../proto/gis.proto"], &["../../proto/"])?;

    // Tell Cargo to rerun if proto files change
    println!("cargo:rerun-if-changed=../../proto/gis.proto");

    Ok(())
}
