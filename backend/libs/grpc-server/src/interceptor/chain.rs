//! Interceptor chaining as a tower layer
//!
//! tonic only offers a single request interceptor per service. The layer here
//! wraps the whole router and runs an ordered list of interceptors around each
//! call: the first interceptor is the outermost, the last one sees the
//! handler directly.

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tonic::body::BoxBody;
use tonic::codegen::http;
use tower::util::BoxCloneService;
use tower::{Layer, Service, ServiceExt};

use crate::methods::{CallInfo, MethodTable};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
pub type GrpcRequest = http::Request<BoxBody>;
pub type GrpcResponse = http::Response<BoxBody>;

/// Middleware wrapping a gRPC call
pub trait Interceptor: Send + Sync + 'static {
    /// Handle `request`, calling `next.run(..)` to continue down the chain
    fn intercept(
        &self,
        call: CallInfo,
        request: GrpcRequest,
        next: Next,
    ) -> BoxFuture<'static, Result<GrpcResponse, BoxError>>;
}

pub type UnaryServerInterceptor = Arc<dyn Interceptor>;
pub type StreamServerInterceptor = Arc<dyn Interceptor>;

/// Ordered interceptor list, first element outermost
pub type InterceptorChain = Arc<[Arc<dyn Interceptor>]>;

/// Remainder of the chain for one call
pub struct Next {
    chain: InterceptorChain,
    position: usize,
    call: CallInfo,
    handler: BoxCloneService<GrpcRequest, GrpcResponse, BoxError>,
}

impl Next {
    pub(crate) fn new(
        chain: InterceptorChain,
        call: CallInfo,
        handler: BoxCloneService<GrpcRequest, GrpcResponse, BoxError>,
    ) -> Self {
        Self {
            chain,
            position: 0,
            call,
            handler,
        }
    }

    /// Run the next interceptor, or the handler once the chain is exhausted
    pub fn run(
        mut self,
        request: GrpcRequest,
    ) -> BoxFuture<'static, Result<GrpcResponse, BoxError>> {
        match self.chain.get(self.position).cloned() {
            Some(interceptor) => {
                self.position += 1;
                let call = self.call.clone();
                interceptor.intercept(call, request, self)
            }
            None => Box::pin(self.handler.oneshot(request)),
        }
    }
}

struct FnInterceptor<F>(F);

impl<F, Fut> Interceptor for FnInterceptor<F>
where
    F: Fn(CallInfo, GrpcRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<GrpcResponse, BoxError>> + Send + 'static,
{
    fn intercept(
        &self,
        call: CallInfo,
        request: GrpcRequest,
        next: Next,
    ) -> BoxFuture<'static, Result<GrpcResponse, BoxError>> {
        Box::pin((self.0)(call, request, next))
    }
}

/// Build an interceptor from an async closure
pub fn interceptor_fn<F, Fut>(f: F) -> Arc<dyn Interceptor>
where
    F: Fn(CallInfo, GrpcRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<GrpcResponse, BoxError>> + Send + 'static,
{
    Arc::new(FnInterceptor(f))
}

/// Layer selecting the unary or stream chain for each call
#[derive(Clone)]
pub struct InterceptorLayer {
    unary: InterceptorChain,
    stream: InterceptorChain,
    methods: Arc<MethodTable>,
}

impl InterceptorLayer {
    pub fn new(
        unary: Vec<Arc<dyn Interceptor>>,
        stream: Vec<Arc<dyn Interceptor>>,
        methods: MethodTable,
    ) -> Self {
        Self {
            unary: unary.into(),
            stream: stream.into(),
            methods: Arc::new(methods),
        }
    }

    pub fn unary_len(&self) -> usize {
        self.unary.len()
    }

    pub fn stream_len(&self) -> usize {
        self.stream.len()
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = InterceptorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptorService {
            inner,
            layer: self.clone(),
        }
    }
}

#[derive(Clone)]
pub struct InterceptorService<S> {
    inner: S,
    layer: InterceptorLayer,
}

impl<S> Service<GrpcRequest> for InterceptorService<S>
where
    S: Service<GrpcRequest, Response = GrpcResponse> + Clone + Send + 'static,
    S::Error: Into<BoxError> + 'static,
    S::Future: Send + 'static,
{
    type Response = GrpcResponse;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<GrpcResponse, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: GrpcRequest) -> Self::Future {
        // Take the service that was driven to readiness, leave a clone behind
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        let call = self.layer.methods.call_info(request.uri().path());
        let chain = if call.kind.is_streaming() {
            self.layer.stream.clone()
        } else {
            self.layer.unary.clone()
        };

        let handler = BoxCloneService::new(inner.map_err(|err: S::Error| err.into()));
        Next::new(chain, call, handler).run(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::CallKind;
    use std::convert::Infallible;
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    fn recording(name: &'static str, journal: Journal) -> Arc<dyn Interceptor> {
        interceptor_fn(move |_call, request, next| {
            let journal = journal.clone();
            async move {
                journal.lock().unwrap().push(format!("{name}:before"));
                let response = next.run(request).await;
                journal.lock().unwrap().push(format!("{name}:after"));
                response
            }
        })
    }

    fn handler(journal: Journal) -> BoxCloneService<GrpcRequest, GrpcResponse, Infallible> {
        BoxCloneService::new(tower::service_fn(move |_request: GrpcRequest| {
            let journal = journal.clone();
            async move {
                journal.lock().unwrap().push("handler".to_string());
                Ok::<_, Infallible>(http::Response::new(tonic::body::empty_body()))
            }
        }))
    }

    fn request(path: &str) -> GrpcRequest {
        http::Request::builder()
            .uri(path)
            .body(tonic::body::empty_body())
            .unwrap()
    }

    #[tokio::test]
    async fn test_unary_chain_runs_in_list_order() {
        let journal: Journal = Arc::default();
        let layer = InterceptorLayer::new(
            vec![
                recording("first", journal.clone()),
                recording("second", journal.clone()),
                recording("third", journal.clone()),
            ],
            Vec::new(),
            MethodTable::new(),
        );

        let service = layer.layer(handler(journal.clone()));
        service.oneshot(request("/demo.Demo/Get")).await.unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "first:before",
                "second:before",
                "third:before",
                "handler",
                "third:after",
                "second:after",
                "first:after",
            ]
        );
    }

    #[tokio::test]
    async fn test_streaming_calls_use_stream_chain() {
        let journal: Journal = Arc::default();
        let mut methods = MethodTable::new();
        methods.insert("/demo.Demo/Watch", CallKind::ServerStreaming);

        let layer = InterceptorLayer::new(
            vec![recording("unary", journal.clone())],
            vec![recording("stream", journal.clone())],
            methods,
        );
        let service = layer.layer(handler(journal.clone()));

        service
            .clone()
            .oneshot(request("/demo.Demo/Watch"))
            .await
            .unwrap();
        service.oneshot(request("/demo.Demo/Get")).await.unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "stream:before",
                "handler",
                "stream:after",
                "unary:before",
                "handler",
                "unary:after",
            ]
        );
    }

    #[tokio::test]
    async fn test_interceptor_can_short_circuit() {
        let journal: Journal = Arc::default();
        let deny = interceptor_fn(|_call, _request, _next| async {
            Ok(tonic::Status::permission_denied("nope").into_http())
        });
        let layer = InterceptorLayer::new(vec![deny], Vec::new(), MethodTable::new());

        let response = layer
            .layer(handler(journal.clone()))
            .oneshot(request("/demo.Demo/Get"))
            .await
            .unwrap();

        let status = tonic::Status::from_header_map(response.headers()).unwrap();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);
        assert!(journal.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_interceptor_sees_call_info() {
        let seen: Arc<Mutex<Option<CallInfo>>> = Arc::default();
        let capture = {
            let seen = seen.clone();
            interceptor_fn(move |call, request, next| {
                *seen.lock().unwrap() = Some(call);
                next.run(request)
            })
        };
        let layer = InterceptorLayer::new(vec![capture], Vec::new(), MethodTable::new());

        layer
            .layer(handler(Arc::default()))
            .oneshot(request("/todo.TodoService/Login"))
            .await
            .unwrap();

        let call = seen.lock().unwrap().clone().unwrap();
        assert_eq!(call.method, "/todo.TodoService/Login");
        assert_eq!(call.kind, CallKind::Unary);
    }
}
