/// gRPC server implementation for todo-service
///
/// Implements the RPCs from todo_service.proto:
/// - Authentication: Login
use tonic::{Request, Response, Status};
use tracing::debug;

// Import generated protobuf types
pub mod todo {
    tonic::include_proto!("todo");
}

/// Encoded descriptors of todo_service.proto, for reflection and for
/// classifying methods in the interceptor layer
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("todo_descriptor");

use todo::login_response::Response as LoginOutcome;
use todo::todo_service_server::TodoService;
use todo::{LoginRequest, LoginResponse};

/// Token handed out by the stub login
pub const STUB_TOKEN: &str = "Success token";

impl LoginResponse {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            response: Some(LoginOutcome::Token(token.into())),
        }
    }

    pub fn with_error(code: i32, message: impl Into<String>) -> Self {
        Self {
            response: Some(LoginOutcome::Error(todo::Error {
                code,
                message: message.into(),
            })),
        }
    }
}

/// Todo service gRPC server
#[derive(Debug, Clone, Default)]
pub struct TodoServer;

impl TodoServer {
    pub fn new() -> Self {
        Self
    }
}

#[tonic::async_trait]
impl TodoService for TodoServer {
    /// Exchange credentials for a session token
    ///
    /// Stub: credentials are not checked and every caller gets the same
    /// token.
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> std::result::Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();
        debug!(username = %req.username, "Login requested");

        Ok(Response::new(LoginResponse::with_token(STUB_TOKEN)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_returns_stub_token() {
        let server = TodoServer::new();
        let response = server
            .login(Request::new(LoginRequest {
                username: "alice".to_string(),
                password: "secret".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(
            response.response,
            Some(LoginOutcome::Token("Success token".to_string()))
        );
    }

    #[tokio::test]
    async fn test_login_ignores_empty_credentials() {
        let response = TodoServer::new()
            .login(Request::new(LoginRequest::default()))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response, LoginResponse::with_token(STUB_TOKEN));
    }

    #[test]
    fn test_with_error_builds_error_variant() {
        let response = LoginResponse::with_error(16, "bad credentials");

        match response.response {
            Some(LoginOutcome::Error(err)) => {
                assert_eq!(err.code, 16);
                assert_eq!(err.message, "bad credentials");
            }
            other => panic!("expected error variant, got {other:?}"),
        }
    }
}
