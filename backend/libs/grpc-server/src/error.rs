//! Error types for server lifecycle operations

use thiserror::Error;

/// Result type for server lifecycle operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while building or starting a server
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be acquired
    #[error("Failed to listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// `start` was called on a server that already started (or failed to)
    #[error("Server has already been started")]
    AlreadyStarted,

    /// Reflection service could not be built from the registered descriptors
    #[error("Failed to build reflection service: {0}")]
    Reflection(String),

    /// An encoded file descriptor set could not be decoded
    #[error("Invalid file descriptor set: {0}")]
    Descriptor(#[from] prost::DecodeError),
}

impl ServerError {
    /// Create a bind error for `address`
    pub fn bind(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    /// Create a reflection error
    pub fn reflection(msg: impl Into<String>) -> Self {
        Self::Reflection(msg.into())
    }
}
