//! Authentication schema and resolvers

use async_graphql::{
    Context, ErrorExtensions, InputObject, Object, Result as GraphQLResult, SimpleObject,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clients::proto::todo::login_response::Response as LoginOutcome;
use crate::clients::proto::todo::LoginRequest as LoginRpcRequest;
use crate::clients::ServiceClients;
use crate::error::GatewayError;

/// Credentials for `login`
#[derive(InputObject, Clone, Debug, Serialize, Deserialize)]
#[graphql(name = "LoginRequest")]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(SimpleObject, Clone, Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Default)]
pub struct AuthQuery;

#[Object]
impl AuthQuery {
    /// Exchange credentials for a session token
    async fn login(&self, ctx: &Context<'_>, input: LoginInput) -> GraphQLResult<LoginResponse> {
        let clients = ctx
            .data::<ServiceClients>()
            .map_err(|_| "Service clients not available")?;

        let mut client = clients.todo_client();

        debug!(username = %input.username, "Forwarding login to todo-service");
        let request = tonic::Request::new(LoginRpcRequest {
            username: input.username,
            password: input.password,
        });

        let response = client
            .login(request)
            .await
            .map_err(|status| {
                warn!(code = ?status.code(), message = %status.message(), "Login call failed");
                GatewayError::from(status).extend()
            })?
            .into_inner();

        match response.response {
            Some(LoginOutcome::Token(token)) => Ok(LoginResponse { token }),
            Some(LoginOutcome::Error(err)) => {
                warn!(code = err.code, message = %err.message, "Login rejected by todo-service");
                Err(GatewayError::upstream(err.code, err.message).extend())
            }
            None => Err(GatewayError::upstream(
                tonic::Code::Unknown as i32,
                "todo-service returned an empty login response",
            )
            .extend()),
        }
    }
}
