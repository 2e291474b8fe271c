/// Todo Service Library
///
/// gRPC backend answering the `Login` call for the GraphQL gateway.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `grpc`: gRPC server implementation and generated types
pub mod config;
pub mod grpc;

pub use grpc::{TodoServer, FILE_DESCRIPTOR_SET};

use grpc::todo::todo_service_server::TodoServiceServer;
use grpc_server::{
    default_stream_server_interceptors, default_unary_server_interceptors, KeepaliveParams,
    RpcServer, RpcServerBuilder,
};

/// Builder preconfigured the way the service binary runs: default
/// interceptor bundles, keepalive and the todo descriptors
pub fn server_builder(settings: &config::ServerSettings) -> RpcServerBuilder {
    RpcServerBuilder::new()
        .set_unary_interceptors(default_unary_server_interceptors())
        .set_stream_interceptors(default_stream_server_interceptors())
        .set_server_parameters(KeepaliveParams {
            interval: Some(settings.keepalive_interval()),
            timeout: Some(settings.keepalive_timeout()),
        })
        .register_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .enable_reflection(settings.enable_reflection)
}

/// Mount `TodoService` backed by `service`
pub fn register_todo_service<T>(server: &mut RpcServer, service: T) -> grpc_server::Result<()>
where
    T: grpc::todo::todo_service_server::TodoService,
{
    server.register_service(|registrar| {
        registrar.add_service(TodoServiceServer::new(service));
    })
}
