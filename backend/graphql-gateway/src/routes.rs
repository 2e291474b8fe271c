//! HTTP routes of the gateway

use actix_web::{web, HttpResponse};
use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::schema::AppSchema;

/// Path of the GraphQL endpoint
pub const GRAPHQL_PATH: &str = "/query";

async fn graphql_handler(schema: web::Data<AppSchema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn health_handler() -> &'static str {
    "ok"
}

/// SDL (Schema Definition Language) endpoint for schema introspection
async fn schema_handler(schema: web::Data<AppSchema>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain")
        .body(schema.sdl())
}

async fn playground_handler() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(playground_source(GraphQLPlaygroundConfig::new(GRAPHQL_PATH)))
}

/// Mount the gateway routes; expects `web::Data<AppSchema>` in app data
///
/// Any path not listed here serves the playground.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(GRAPHQL_PATH, web::post().to(graphql_handler))
        .route(GRAPHQL_PATH, web::get().to(playground_handler))
        .route("/", web::get().to(playground_handler))
        .route("/schema", web::get().to(schema_handler))
        .route("/health", web::get().to(health_handler))
        .default_service(web::to(playground_handler));
}
