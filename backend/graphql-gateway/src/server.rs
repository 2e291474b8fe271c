//! HTTP server wiring

use std::future::Future;
use std::net::TcpListener;

use actix_web::dev::{Server, ServerHandle};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing::info;

use crate::routes::configure;
use crate::schema::AppSchema;

/// Serve the gateway on an already bound listener
///
/// OS signals are not handled by actix; pair the returned server with
/// [`stop_on`] so in-flight requests get `shutdown_grace_secs` to finish.
pub fn http_server(
    schema: AppSchema,
    listener: TcpListener,
    shutdown_grace_secs: u64,
) -> std::io::Result<Server> {
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(schema.clone()))
            .configure(configure)
    })
    .disable_signals()
    .shutdown_timeout(shutdown_grace_secs)
    .listen(listener)?
    .run();

    Ok(server)
}

/// Wait for `signal`, then stop accepting and drain in-flight requests
pub async fn stop_on<F>(signal: F, handle: ServerHandle)
where
    F: Future<Output = ()>,
{
    signal.await;
    info!("Stopping GraphQL Gateway");
    handle.stop(true).await;
}
