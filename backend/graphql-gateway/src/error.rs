//! Errors surfaced to GraphQL clients
//!
//! Backend failures never abort the gateway; they become GraphQL errors with
//! a machine readable `extensions.code`.

use async_graphql::ErrorExtensions;
use thiserror::Error;
use tonic::{Code, Status};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Backend could not be reached
    #[error("Backend unavailable: {0}")]
    Transport(String),

    /// Per-call deadline elapsed before the backend answered
    #[error("Backend call timed out: {0}")]
    DeadlineExceeded(String),

    /// Backend answered with a non-OK status or an error payload
    #[error("Backend error (code {code}): {message}")]
    Upstream { code: i32, message: String },
}

impl GatewayError {
    pub fn upstream(code: i32, message: impl Into<String>) -> Self {
        Self::Upstream {
            code,
            message: message.into(),
        }
    }

    /// Value of `extensions.code`
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::DeadlineExceeded(_) => "DEADLINE_EXCEEDED",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
        }
    }
}

impl From<Status> for GatewayError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::Unavailable => Self::Transport(status.message().to_string()),
            Code::Unknown if is_transport_error(&status) => {
                Self::Transport(status.message().to_string())
            }
            Code::DeadlineExceeded => Self::DeadlineExceeded(status.message().to_string()),
            code => Self::upstream(code as i32, status.message()),
        }
    }
}

/// Client-side transport failures that tonic did not classify
fn is_transport_error(status: &Status) -> bool {
    std::error::Error::source(status)
        .map_or(false, |source| source.is::<tonic::transport::Error>())
}

impl ErrorExtensions for GatewayError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| {
            ext.set("code", self.code());
            if let Self::Upstream { code, .. } = self {
                ext.set("grpcCode", *code);
            }
        })
    }
}
