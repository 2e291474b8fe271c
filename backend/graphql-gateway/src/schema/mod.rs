//! GraphQL schema

pub mod auth;

use async_graphql::{EmptyMutation, EmptySubscription, MergedObject, Schema};

use crate::clients::ServiceClients;

/// Root query object
#[derive(MergedObject, Default)]
pub struct QueryRoot(auth::AuthQuery);

/// GraphQL App Schema type
pub type AppSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Build the GraphQL schema with the backend clients as context data
pub fn build_schema(clients: ServiceClients) -> AppSchema {
    Schema::build(QueryRoot::default(), EmptyMutation, EmptySubscription)
        .data(clients)
        .finish()
}
