/// gRPC server module for todo-service
///
/// Exports:
/// - TodoServer: Login implementation
/// - todo: Generated protobuf types from todo_service.proto
pub mod server;

pub use server::todo;
pub use server::{TodoServer, FILE_DESCRIPTOR_SET, STUB_TOKEN};
