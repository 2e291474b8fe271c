//! gRPC service clients
//!
//! One lazily connected `Channel` to todo-service is created at startup and
//! shared by every request; HTTP/2 multiplexing handles concurrency. Calls go
//! through the default client interceptors, so each one carries the login
//! deadline and a tracing span.

use std::time::Duration;

use grpc_server::{intercept_channel, InterceptedChannel};
use thiserror::Error;
use tonic::transport::Endpoint;

// Proto module definitions from build.rs
pub mod proto {
    pub mod todo {
        tonic::include_proto!("todo");
    }
}

use proto::todo::todo_service_client::TodoServiceClient;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },
}

/// Service client manager holding the shared backend channel
#[derive(Clone)]
pub struct ServiceClients {
    todo_channel: InterceptedChannel,
}

impl ServiceClients {
    /// Create clients for `todo_endpoint` with a per-call deadline
    ///
    /// No connection is attempted here; the channel connects on first use
    /// and reconnects after failures.
    pub fn new(todo_endpoint: &str, login_timeout: Duration) -> Result<Self, ServiceError> {
        let channel = Endpoint::from_shared(todo_endpoint.to_string())
            .map_err(|source| ServiceError::InvalidEndpoint {
                endpoint: todo_endpoint.to_string(),
                source,
            })?
            .connect_timeout(Duration::from_secs(5))
            .http2_keep_alive_interval(Duration::from_secs(60))
            .keep_alive_timeout(Duration::from_secs(20))
            .connect_lazy();

        Ok(Self {
            todo_channel: intercept_channel(channel, login_timeout),
        })
    }

    /// Get a todo service client sharing the channel
    pub fn todo_client(&self) -> TodoServiceClient<InterceptedChannel> {
        TodoServiceClient::new(self.todo_channel.clone())
    }
}
