//! GraphQL Gateway Library
//! Re-exports modules for testing and integration

pub mod clients;
pub mod config;
pub mod error;
pub mod routes;
pub mod schema;
pub mod server;

pub use clients::ServiceClients;
pub use error::GatewayError;
pub use routes::configure;
pub use schema::{build_schema, AppSchema};
pub use server::{http_server, stop_on};
