//! Stopping the gateway lets in-flight requests finish

use graphql_gateway::{build_schema, http_server, stop_on, ServiceClients};
use grpc_server::RpcServer;
use serde_json::{json, Value};
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;
use todo_service::config::ServerSettings;
use todo_service::grpc::todo::todo_service_server::TodoService;
use todo_service::grpc::todo::{LoginRequest, LoginResponse};
use todo_service::{register_todo_service, server_builder};
use tokio::sync::oneshot;
use tonic::{Request, Response, Status};

struct SlowTodo;

#[tonic::async_trait]
impl TodoService for SlowTodo {
    async fn login(
        &self,
        _request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(Response::new(LoginResponse::with_token("Success token")))
    }
}

async fn backend() -> (RpcServer, SocketAddr) {
    let settings = ServerSettings {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..ServerSettings::default()
    };
    let mut server = server_builder(&settings).build().unwrap();
    register_todo_service(&mut server, SlowTodo).unwrap();
    let addr = server.start(&settings.host, settings.port).await.unwrap();
    (server, addr)
}

#[actix_web::test]
async fn test_stop_drains_in_flight_login() {
    let (mut backend, backend_addr) = backend().await;
    let clients =
        ServiceClients::new(&format!("http://{backend_addr}"), Duration::from_secs(5)).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = http_server(build_schema(clients), listener, 5).unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let stopper = actix_web::rt::spawn(stop_on(
        async {
            let _ = stop_rx.await;
        },
        server.handle(),
    ));
    let running = actix_web::rt::spawn(server);

    let url = format!("http://{addr}/query");
    let in_flight = tokio::spawn(async move {
        reqwest::Client::new()
            .post(url)
            .json(&json!({
                "query": r#"{ login(input: { username: "alice", password: "secret" }) { token } }"#
            }))
            .send()
            .await?
            .json::<Value>()
            .await
    });

    // The backend holds the login for 500ms
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!in_flight.is_finished());
    stop_tx.send(()).unwrap();
    stopper.await.unwrap();

    let body = in_flight.await.unwrap().unwrap();
    assert_eq!(body["data"]["login"]["token"], "Success token");

    running.await.unwrap().unwrap();
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());

    backend.shutdown().await;
}
