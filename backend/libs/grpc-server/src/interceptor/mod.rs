//! Interceptor library
//!
//! - `chain`: ordered server interceptor chains applied as a tower layer
//! - `recovery`: panic-to-status recovery
//! - `client`: deadline and tracing layers for tonic channels
//!
//! The `default_*` functions return the bundles every service starts from.

pub mod chain;
pub mod client;
pub mod recovery;

use std::any::Any;
use std::sync::Arc;

use tonic::Status;
use tracing::error;

pub use chain::{
    interceptor_fn, BoxError, GrpcRequest, GrpcResponse, Interceptor, InterceptorLayer,
    InterceptorService, Next, StreamServerInterceptor, UnaryServerInterceptor,
};
pub use client::{
    default_stream_client_interceptors, default_unary_client_interceptors, intercept_channel,
    ClientInterceptors, Deadline, DeadlineLayer, InterceptedChannel,
};
pub use recovery::{panic_message, RecoveryHandler, RecoveryInterceptor};

use crate::methods::CallInfo;

/// Message returned to callers when a handler panics
pub const RECOVERED_PANIC_MESSAGE: &str = "Something went wrong :( ";

/// Recovery handler used by the default server bundles
pub fn request_error_handler(call: &CallInfo, panic: &(dyn Any + Send)) -> Status {
    error!(
        method = %call.method,
        panic = %panic_message(panic),
        "Recovered from panic in gRPC handler"
    );
    Status::internal(RECOVERED_PANIC_MESSAGE)
}

/// Default interceptors for unary server calls
///
/// Recovery should stay in front of any interceptor that must not see a raw
/// panic; interceptors registered before it observe the recovered status.
pub fn default_unary_server_interceptors() -> Vec<UnaryServerInterceptor> {
    vec![Arc::new(RecoveryInterceptor::new(request_error_handler))]
}

/// Default interceptors for streaming server calls
pub fn default_stream_server_interceptors() -> Vec<StreamServerInterceptor> {
    vec![Arc::new(RecoveryInterceptor::new(request_error_handler))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::{CallKind, MethodTable};
    use std::convert::Infallible;
    use tonic::codegen::http;
    use tower::util::BoxCloneService;
    use tower::{Layer, ServiceExt};

    #[test]
    fn test_request_error_handler_status() {
        let call = CallInfo {
            method: "/todo.TodoService/Login".to_string(),
            kind: CallKind::Unary,
        };
        let status = request_error_handler(&call, &"boom");

        assert_eq!(status.code(), tonic::Code::Internal);
        assert_eq!(status.message(), "Something went wrong :( ");
    }

    #[test]
    fn test_default_bundles_have_single_recovery() {
        assert_eq!(default_unary_server_interceptors().len(), 1);
        assert_eq!(default_stream_server_interceptors().len(), 1);
    }

    #[tokio::test]
    async fn test_default_stream_bundle_recovers_streaming_call() {
        let mut methods = MethodTable::new();
        methods.insert("/demo.Demo/Watch", CallKind::ServerStreaming);
        let layer = InterceptorLayer::new(
            Vec::new(),
            default_stream_server_interceptors(),
            methods,
        );

        let inner: BoxCloneService<GrpcRequest, GrpcResponse, Infallible> =
            BoxCloneService::new(tower::service_fn(|_request: GrpcRequest| async {
                if true {
                    panic!("stream boom");
                }
                Ok::<_, Infallible>(http::Response::new(tonic::body::empty_body()))
            }));

        let request = http::Request::builder()
            .uri("/demo.Demo/Watch")
            .body(tonic::body::empty_body())
            .unwrap();
        let response = layer.layer(inner).oneshot(request).await.unwrap();

        let status = Status::from_header_map(response.headers()).unwrap();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert_eq!(status.message(), RECOVERED_PANIC_MESSAGE);
    }
}
