//! Builder pattern for gRPC server construction
//!
//! The builder accumulates an ordered list of server options plus the
//! reflection toggle and is consumed exactly once by `build()`.

use std::time::Duration;

use tonic::transport::Server;
use tracing::{debug, info};

use crate::error::{Result, ServerError};
use crate::interceptor::{InterceptorLayer, StreamServerInterceptor, UnaryServerInterceptor};
use crate::methods::{CallKind, MethodTable};
use crate::server::{RpcServer, ServiceRegistrar, ShutdownHook};

const REFLECTION_INFO_METHOD: &str = "/grpc.reflection.v1.ServerReflection/ServerReflectionInfo";

/// HTTP/2 keepalive parameters for accepted connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveParams {
    /// Interval between server-initiated PING frames
    pub interval: Option<Duration>,
    /// How long to wait for a PING acknowledgement before closing
    pub timeout: Option<Duration>,
}

impl Default for KeepaliveParams {
    fn default() -> Self {
        Self {
            interval: Some(Duration::from_secs(60)),
            timeout: Some(Duration::from_secs(20)),
        }
    }
}

/// A single server configuration entry
///
/// Options are applied in the order they were added. Interceptor options
/// compose: a chain added later runs inside the chains added before it.
#[derive(Clone)]
pub enum ServerOption {
    Keepalive(KeepaliveParams),
    UnaryInterceptors(Vec<UnaryServerInterceptor>),
    StreamInterceptors(Vec<StreamServerInterceptor>),
    /// Maximum concurrent requests per connection
    ConcurrencyLimitPerConnection(usize),
    /// Server-side upper bound on request duration
    Timeout(Duration),
    MaxConcurrentStreams(u32),
    TcpNodelay(bool),
}

impl std::fmt::Debug for ServerOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keepalive(params) => f.debug_tuple("Keepalive").field(params).finish(),
            Self::UnaryInterceptors(chain) => {
                f.debug_tuple("UnaryInterceptors").field(&chain.len()).finish()
            }
            Self::StreamInterceptors(chain) => {
                f.debug_tuple("StreamInterceptors").field(&chain.len()).finish()
            }
            Self::ConcurrencyLimitPerConnection(limit) => f
                .debug_tuple("ConcurrencyLimitPerConnection")
                .field(limit)
                .finish(),
            Self::Timeout(timeout) => f.debug_tuple("Timeout").field(timeout).finish(),
            Self::MaxConcurrentStreams(max) => {
                f.debug_tuple("MaxConcurrentStreams").field(max).finish()
            }
            Self::TcpNodelay(enabled) => f.debug_tuple("TcpNodelay").field(enabled).finish(),
        }
    }
}

/// Builder for [`RpcServer`]
///
/// # Example
///
/// ```rust,no_run
/// use grpc_server::{default_unary_server_interceptors, RpcServerBuilder};
///
/// # async fn example() -> Result<(), grpc_server::ServerError> {
/// let mut server = RpcServerBuilder::new()
///     .set_unary_interceptors(default_unary_server_interceptors())
///     .enable_reflection(true)
///     .build()?;
///
/// server.start("0.0.0.0", 9090).await?;
/// server.await_termination(None).await;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct RpcServerBuilder {
    options: Vec<ServerOption>,
    enabled_reflection: bool,
    descriptor_sets: Vec<&'static [u8]>,
    shutdown_hook: Option<ShutdownHook>,
}

impl RpcServerBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a server option
    pub fn add_option(mut self, option: ServerOption) -> Self {
        self.options.push(option);
        self
    }

    /// Enable gRPC server reflection
    ///
    /// Reflection lets tools such as `grpcurl` enumerate services and message
    /// shapes at runtime. Do not enable it on servers exposed in production.
    pub fn enable_reflection(mut self, enabled: bool) -> Self {
        self.enabled_reflection = enabled;
        self
    }

    /// Set HTTP/2 keepalive parameters
    pub fn set_server_parameters(self, params: KeepaliveParams) -> Self {
        self.add_option(ServerOption::Keepalive(params))
    }

    /// Set the interceptors run around unary calls, first one outermost
    pub fn set_unary_interceptors(self, interceptors: Vec<UnaryServerInterceptor>) -> Self {
        self.add_option(ServerOption::UnaryInterceptors(interceptors))
    }

    /// Set the interceptors run around streaming calls, first one outermost
    pub fn set_stream_interceptors(self, interceptors: Vec<StreamServerInterceptor>) -> Self {
        self.add_option(ServerOption::StreamInterceptors(interceptors))
    }

    /// Register the encoded descriptors of a service that will be mounted
    ///
    /// Descriptors feed reflection and tell the interceptor layer which
    /// methods are streaming.
    pub fn register_file_descriptor_set(mut self, encoded: &'static [u8]) -> Self {
        self.descriptor_sets.push(encoded);
        self
    }

    /// Hook run after shutdown when `await_termination` is given none
    pub fn set_shutdown_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.shutdown_hook = Some(Box::new(hook));
        self
    }

    pub fn options(&self) -> &[ServerOption] {
        &self.options
    }

    pub fn reflection_enabled(&self) -> bool {
        self.enabled_reflection
    }

    /// Build the server
    ///
    /// The health service is always mounted; reflection only when enabled.
    /// The returned server is not listening yet.
    pub fn build(self) -> Result<RpcServer> {
        let mut server = Server::builder();
        let mut nodelay = true;
        let mut unary: Vec<UnaryServerInterceptor> = Vec::new();
        let mut stream: Vec<StreamServerInterceptor> = Vec::new();

        for option in self.options {
            debug!(option = ?option, "Applying gRPC server option");
            server = match option {
                ServerOption::Keepalive(params) => server
                    .http2_keepalive_interval(params.interval)
                    .http2_keepalive_timeout(params.timeout),
                ServerOption::UnaryInterceptors(chain) => {
                    unary.extend(chain);
                    server
                }
                ServerOption::StreamInterceptors(chain) => {
                    stream.extend(chain);
                    server
                }
                ServerOption::ConcurrencyLimitPerConnection(limit) => {
                    server.concurrency_limit_per_connection(limit)
                }
                ServerOption::Timeout(timeout) => server.timeout(timeout),
                ServerOption::MaxConcurrentStreams(max) => {
                    server.max_concurrent_streams(Some(max))
                }
                ServerOption::TcpNodelay(enabled) => {
                    nodelay = enabled;
                    server
                }
            };
        }

        let mut methods = MethodTable::new();
        methods.register_encoded(tonic_health::pb::FILE_DESCRIPTOR_SET)?;
        for encoded in &self.descriptor_sets {
            methods.register_encoded(encoded)?;
        }

        let (health_reporter, health_service) = tonic_health::server::health_reporter();
        let mut registrar = ServiceRegistrar::new();
        registrar.add_service(health_service);

        if self.enabled_reflection {
            let mut reflection = tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(tonic_health::pb::FILE_DESCRIPTOR_SET);
            for encoded in &self.descriptor_sets {
                reflection = reflection.register_encoded_file_descriptor_set(encoded);
            }
            let reflection_service = reflection
                .build_v1()
                .map_err(|e| ServerError::reflection(e.to_string()))?;

            methods.insert(REFLECTION_INFO_METHOD, CallKind::BidiStreaming);
            registrar.add_service(reflection_service);
            info!("gRPC reflection service enabled");
        }

        let layer = InterceptorLayer::new(unary, stream, methods);
        info!(
            unary_interceptors = layer.unary_len(),
            stream_interceptors = layer.stream_len(),
            reflection = self.enabled_reflection,
            "gRPC server built"
        );

        Ok(RpcServer::new(
            server,
            registrar,
            layer,
            nodelay,
            health_reporter,
            self.shutdown_hook,
        ))
    }
}
