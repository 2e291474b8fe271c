fn main() {
    // GraphQL Gateway acts as gRPC CLIENT to call todo-service
    // We only need client code, not server implementations

    println!("cargo:rerun-if-changed=../proto/services/todo_service.proto");

    tonic_build::configure()
        .build_server(false) // GraphQL Gateway doesn't provide gRPC server
        .build_client(true) // GraphQL Gateway calls todo-service as client
        .compile_protos(
            &["../proto/services/todo_service.proto"],
            &["../proto/services/"],
        )
        .expect("Failed to compile proto files for GraphQL Gateway");
}
