//! # gRPC Server Scaffold
//!
//! Reusable building blocks for running tonic services:
//!
//! - [`RpcServerBuilder`]: ordered server options, interceptor chains and
//!   optional reflection, consumed once into an [`RpcServer`]
//! - [`RpcServer`]: service registration, start, graceful shutdown and
//!   signal driven termination
//! - [`interceptor`]: server interceptor chains, panic recovery and client
//!   deadline/tracing layers
//!
//! The standard `grpc.health.v1.Health` service is mounted on every server and
//! reports `SERVING` while the server runs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use grpc_server::{
//!     default_stream_server_interceptors, default_unary_server_interceptors, KeepaliveParams,
//!     RpcServerBuilder,
//! };
//!
//! # async fn example() -> Result<(), grpc_server::ServerError> {
//! let mut server = RpcServerBuilder::new()
//!     .set_unary_interceptors(default_unary_server_interceptors())
//!     .set_stream_interceptors(default_stream_server_interceptors())
//!     .set_server_parameters(KeepaliveParams::default())
//!     .build()?;
//!
//! // server.register_service(|registrar| { registrar.add_service(...); })?;
//! server.start("0.0.0.0", 9090).await?;
//! server
//!     .await_termination(Some(Box::new(|| tracing::info!("Shutting down"))))
//!     .await;
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
pub mod interceptor;
mod methods;
mod server;

pub use builder::{KeepaliveParams, RpcServerBuilder, ServerOption};
pub use error::{Result, ServerError};
pub use interceptor::{
    default_stream_client_interceptors, default_stream_server_interceptors,
    default_unary_client_interceptors, default_unary_server_interceptors, intercept_channel,
    interceptor_fn, request_error_handler, InterceptedChannel, Interceptor, RecoveryInterceptor,
    StreamServerInterceptor, UnaryServerInterceptor, RECOVERED_PANIC_MESSAGE,
};
pub use methods::{CallInfo, CallKind, MethodTable};
pub use server::{
    shutdown_signal, RpcServer, ServerState, ServiceRegistrar, ShutdownHook, HEALTH_SERVICE,
    REFLECTION_SERVICE,
};

// Re-export tonic-health types for convenience
pub use tonic_health::server::HealthReporter;
pub use tonic_health::ServingStatus;
