//! Server lifecycle: register services, start listening, drain on shutdown

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;
use tonic::body::BoxBody;
use tonic::codegen::http;
use tonic::server::NamedService;
use tonic::service::RoutesBuilder;
use tonic::transport::Server;
use tonic_health::server::HealthReporter;
use tonic_health::ServingStatus;
use tower::Service;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ServerError};
use crate::interceptor::InterceptorLayer;

pub const HEALTH_SERVICE: &str = "grpc.health.v1.Health";
pub const REFLECTION_SERVICE: &str = "grpc.reflection.v1.ServerReflection";

/// Callback run once after the server has stopped
pub type ShutdownHook = Box<dyn FnOnce() + Send + 'static>;

/// Collects the services mounted on a server
pub struct ServiceRegistrar {
    routes: RoutesBuilder,
    services: Vec<&'static str>,
}

impl ServiceRegistrar {
    pub(crate) fn new() -> Self {
        Self {
            routes: RoutesBuilder::default(),
            services: Vec::new(),
        }
    }

    /// Mount a tonic-generated service
    pub fn add_service<S>(&mut self, service: S) -> &mut Self
    where
        S: Service<http::Request<BoxBody>, Response = http::Response<BoxBody>, Error = Infallible>
            + NamedService
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        debug!(service = S::NAME, "Registering gRPC service");
        self.services.push(S::NAME);
        self.routes.add_service(service);
        self
    }

    /// Fully qualified names of the mounted services, in registration order
    pub fn services(&self) -> &[&'static str] {
        &self.services
    }
}

/// Observable lifecycle state of an [`RpcServer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Configured,
    Serving,
    Failed,
    Stopped,
}

struct Pending {
    server: Server,
    registrar: ServiceRegistrar,
    layer: InterceptorLayer,
    nodelay: bool,
}

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

enum State {
    Configured(Box<Pending>),
    Serving(Running),
    Failed,
    Stopped,
}

/// A configured gRPC server
///
/// Created by [`RpcServerBuilder::build`](crate::RpcServerBuilder::build).
/// A server starts at most once; after a failed start or a shutdown the
/// instance cannot serve again.
pub struct RpcServer {
    state: State,
    services: Vec<&'static str>,
    health: HealthReporter,
    local_addr: Option<SocketAddr>,
    shutdown_hook: Option<ShutdownHook>,
}

impl RpcServer {
    pub(crate) fn new(
        server: Server,
        registrar: ServiceRegistrar,
        layer: InterceptorLayer,
        nodelay: bool,
        health: HealthReporter,
        shutdown_hook: Option<ShutdownHook>,
    ) -> Self {
        let services = registrar.services().to_vec();
        Self {
            state: State::Configured(Box::new(Pending {
                server,
                registrar,
                layer,
                nodelay,
            })),
            services,
            health,
            local_addr: None,
            shutdown_hook,
        }
    }

    pub fn services(&self) -> Vec<&'static str> {
        self.services.clone()
    }

    /// Address the listener is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        match self.state {
            State::Configured(_) => ServerState::Configured,
            State::Serving(_) => ServerState::Serving,
            State::Failed => ServerState::Failed,
            State::Stopped => ServerState::Stopped,
        }
    }

    /// Handle for updating per-service health
    pub fn health_reporter(&self) -> HealthReporter {
        self.health.clone()
    }

    /// Mount services before the server is started
    ///
    /// ```rust,ignore
    /// server.register_service(|registrar| {
    ///     registrar.add_service(TodoServiceServer::new(TodoServer::default()));
    /// })?;
    /// ```
    pub fn register_service<F>(&mut self, register: F) -> Result<()>
    where
        F: FnOnce(&mut ServiceRegistrar),
    {
        match &mut self.state {
            State::Configured(pending) => {
                register(&mut pending.registrar);
                self.services = pending.registrar.services().to_vec();
                Ok(())
            }
            _ => Err(ServerError::AlreadyStarted),
        }
    }

    /// Bind `address:port` and serve in a background task
    ///
    /// Port 0 binds an ephemeral port; the bound address is returned.
    pub async fn start(&mut self, address: &str, port: u16) -> Result<SocketAddr> {
        if !matches!(self.state, State::Configured(_)) {
            return Err(ServerError::AlreadyStarted);
        }

        let display = format!("{address}:{port}");
        let bound = TcpListener::bind((address, port))
            .await
            .and_then(|listener| listener.local_addr().map(|addr| (listener, addr)));
        // Only a bind error moves the server to Failed
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(e) => {
                self.state = State::Failed;
                return Err(ServerError::bind(&display, e));
            }
        };

        let State::Configured(pending) = std::mem::replace(&mut self.state, State::Stopped) else {
            return Err(ServerError::AlreadyStarted);
        };
        let Pending {
            server,
            registrar,
            layer,
            nodelay,
        } = *pending;

        let incoming = TcpListenerStream::new(listener).map(move |conn| {
            if let Ok(stream) = &conn {
                if let Err(e) = stream.set_nodelay(nodelay) {
                    warn!(error = %e, "Failed to set TCP_NODELAY");
                }
            }
            conn
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let router = server
            .layer(layer)
            .add_routes(registrar.routes.routes());

        let task = tokio::spawn(async move {
            let signal = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = router.serve_with_incoming_shutdown(incoming, signal).await {
                error!(error = %e, "gRPC server terminated with error");
            }
        });

        self.local_addr = Some(local_addr);
        self.state = State::Serving(Running {
            shutdown: shutdown_tx,
            task,
        });

        for service in &self.services {
            self.health
                .set_service_status(*service, ServingStatus::Serving)
                .await;
        }
        info!(port = local_addr.port(), address = %local_addr, "gRPC server started on port");

        Ok(local_addr)
    }

    /// Stop accepting connections and wait for in-flight calls to finish
    ///
    /// Calling this more than once is a no-op.
    pub async fn shutdown(&mut self) {
        match std::mem::replace(&mut self.state, State::Stopped) {
            State::Serving(running) => {
                info!("Stopping the server");
                for service in &self.services {
                    self.health
                        .set_service_status(*service, ServingStatus::NotServing)
                        .await;
                }

                let _ = running.shutdown.send(());
                if let Err(e) = running.task.await {
                    error!(error = %e, "gRPC serve task panicked");
                }
                info!("Closing the listener");
                info!("End of program");
            }
            State::Configured(_) => debug!("Server was never started"),
            State::Failed => self.state = State::Failed,
            State::Stopped => debug!("Server already stopped"),
        }
    }

    /// Block until SIGINT or SIGTERM, then shut down and run the hook
    ///
    /// `hook` replaces the one set on the builder; at most one hook runs.
    pub async fn await_termination(&mut self, hook: Option<ShutdownHook>) {
        self.await_termination_with(shutdown_signal(), hook).await;
    }

    /// Same as [`await_termination`](Self::await_termination) with a caller
    /// supplied termination signal
    pub async fn await_termination_with<F>(&mut self, signal: F, hook: Option<ShutdownHook>)
    where
        F: Future<Output = ()>,
    {
        signal.await;
        self.shutdown().await;

        let builder_hook = self.shutdown_hook.take();
        if let Some(hook) = hook.or(builder_hook) {
            hook();
        }
    }
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
