/// Todo Service Main Entry Point
///
/// Starts gRPC server with:
/// - TodoService (Login)
/// - Health service (always) and reflection (configurable)
/// - Panic recovery interceptors
use anyhow::{Context, Result};
use todo_service::{config::Settings, register_todo_service, server_builder, TodoServer};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "todo_service=info,grpc_server=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Todo Service");

    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    let mut server = server_builder(&settings.server)
        .build()
        .context("Failed to build gRPC server")?;
    register_todo_service(&mut server, TodoServer::new())
        .context("Failed to register TodoService")?;

    server
        .start(&settings.server.host, settings.server.port)
        .await
        .context("Failed to start gRPC server")?;

    server
        .await_termination(Some(Box::new(|| info!("Shutting down the server"))))
        .await;

    info!("Todo service shutdown complete");

    Ok(())
}
