// Build script for todo-service
// Compiles todo_service.proto for gRPC server and client code generation
use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=../proto/services/todo_service.proto");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    // todo-service PROVIDES TodoService (server implementation)
    // Client code is also generated for integration tests and the gateway tests
    // The descriptor set feeds reflection and interceptor method classification
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(out_dir.join("todo_descriptor.bin"))
        .compile_protos(
            &["../proto/services/todo_service.proto"],
            &["../proto/services"],
        )
        .expect("Failed to compile todo_service.proto for todo-service");
}
