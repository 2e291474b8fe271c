use std::net::TcpListener;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use graphql_gateway::{build_schema, config::Config, http_server, stop_on, ServiceClients};

#[actix_web::main]
async fn main() -> Result<()> {
    // Structured JSON logs for log aggregation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,graphql_gateway=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    info!("Starting GraphQL Gateway...");

    let config = Config::from_env().context("Failed to load configuration")?;

    let clients = ServiceClients::new(
        &config.services.todo_service,
        config.services.login_timeout(),
    )
    .context("Failed to initialize service clients")?;
    info!(
        todo_service = %config.services.todo_service,
        login_timeout_ms = config.services.login_timeout_ms,
        "Service clients initialized"
    );

    let schema = build_schema(clients);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!(
        "connect to http://localhost:{}/ for GraphQL playground",
        config.server.port
    );

    let listener =
        TcpListener::bind(&bind_addr).with_context(|| format!("Failed to bind {bind_addr}"))?;
    let server = http_server(schema, listener, config.server.shutdown_grace_secs)
        .context("Failed to start HTTP server")?;

    // Signals are handled here so the grace window applies to SIGINT too
    let handle = server.handle();
    let grace_secs = config.server.shutdown_grace_secs;
    actix_web::rt::spawn(async move {
        stop_on(
            async {
                grpc_server::shutdown_signal().await;
                info!(grace_secs, "Shutdown signal received");
            },
            handle,
        )
        .await;
    });

    info!("server starting");
    if let Err(e) = server.await {
        error!(error = %e, "GraphQL Gateway terminated with error");
        return Err(e).context("GraphQL Gateway server error");
    }

    info!("server stopped");
    Ok(())
}
