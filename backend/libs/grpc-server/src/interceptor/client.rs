//! Client-side interceptors: per-call deadline and tracing
//!
//! Client interceptors are tower layers stacked on top of a tonic `Channel`.
//! The first layer added is the outermost, so the deadline covers the time
//! spent inside the tracing layer as well.

use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use tonic::codegen::http::{self, HeaderValue};
use tonic::transport::Channel;
use tonic::Status;
use tower::layer::util::{Identity, Stack};
use tower::{Layer, Service, ServiceBuilder};
use tower_http::classify::{GrpcErrorsAsFailures, SharedClassifier};
use tower_http::trace::{Trace, TraceLayer};

use super::chain::BoxError;

const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Enforces a deadline on every call and advertises it to the server
#[derive(Debug, Clone, Copy)]
pub struct DeadlineLayer {
    timeout: Duration,
}

impl DeadlineLayer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl<S> Layer<S> for DeadlineLayer {
    type Service = Deadline<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Deadline {
            inner,
            timeout: self.timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Deadline<S> {
    inner: S,
    timeout: Duration,
}

impl<S, B> Service<http::Request<B>> for Deadline<S>
where
    S: Service<http::Request<B>>,
    S::Error: Into<BoxError>,
    S::Response: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<S::Response, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut request: http::Request<B>) -> Self::Future {
        let timeout = self.timeout;

        // An explicit per-request timeout set by the caller wins on the wire
        if !request.headers().contains_key(GRPC_TIMEOUT_HEADER) {
            if let Some(value) = encode_grpc_timeout(timeout) {
                request.headers_mut().insert(GRPC_TIMEOUT_HEADER, value);
            }
        }

        let call = self.inner.call(request);
        Box::pin(async move {
            match tokio::time::timeout(timeout, call).await {
                Ok(result) => result.map_err(Into::into),
                Err(_) => {
                    let status =
                        Status::deadline_exceeded(format!("deadline of {timeout:?} exceeded"));
                    Err(Box::new(status) as BoxError)
                }
            }
        })
    }
}

/// `grpc-timeout` value in milliseconds, `None` when it does not fit the
/// eight digit limit of the header
fn encode_grpc_timeout(timeout: Duration) -> Option<HeaderValue> {
    let millis = timeout.as_millis();
    if millis > 99_999_999 {
        return None;
    }
    HeaderValue::from_str(&format!("{millis}m")).ok()
}

pub type TraceGrpcLayer = TraceLayer<SharedClassifier<GrpcErrorsAsFailures>>;

/// Ordered client interceptors: deadline, then tracing
pub type ClientInterceptors =
    ServiceBuilder<Stack<TraceGrpcLayer, Stack<DeadlineLayer, Identity>>>;

/// Channel wrapped with the default client interceptors
pub type InterceptedChannel = Deadline<Trace<Channel, SharedClassifier<GrpcErrorsAsFailures>>>;

/// Default interceptors for unary client calls
pub fn default_unary_client_interceptors(timeout: Duration) -> ClientInterceptors {
    ServiceBuilder::new()
        .layer(DeadlineLayer::new(timeout))
        .layer(TraceLayer::new_for_grpc())
}

/// Default interceptors for streaming client calls
///
/// The deadline bounds the time until the response head arrives; message
/// streaming after that point is not cut off.
pub fn default_stream_client_interceptors(timeout: Duration) -> ClientInterceptors {
    ServiceBuilder::new()
        .layer(DeadlineLayer::new(timeout))
        .layer(TraceLayer::new_for_grpc())
}

/// Wrap `channel` with the default unary client interceptors
pub fn intercept_channel(channel: Channel, timeout: Duration) -> InterceptedChannel {
    default_unary_client_interceptors(timeout).service(channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::ServiceExt;

    #[test]
    fn test_encode_grpc_timeout() {
        assert_eq!(
            encode_grpc_timeout(Duration::from_secs(1)).unwrap(),
            HeaderValue::from_static("1000m")
        );
        assert!(encode_grpc_timeout(Duration::from_secs(200_000)).is_none());
    }

    #[tokio::test]
    async fn test_deadline_sets_header_and_passes_response() {
        let service = DeadlineLayer::new(Duration::from_millis(250)).layer(tower::service_fn(
            |request: http::Request<()>| async move {
                let header = request
                    .headers()
                    .get(GRPC_TIMEOUT_HEADER)
                    .cloned()
                    .unwrap();
                Ok::<_, Infallible>(header)
            },
        ));

        let header = service.oneshot(http::Request::new(())).await.unwrap();
        assert_eq!(header, HeaderValue::from_static("250m"));
    }

    #[tokio::test]
    async fn test_deadline_keeps_explicit_header() {
        let service = DeadlineLayer::new(Duration::from_secs(1)).layer(tower::service_fn(
            |request: http::Request<()>| async move {
                Ok::<_, Infallible>(request.headers().get(GRPC_TIMEOUT_HEADER).cloned())
            },
        ));

        let mut request = http::Request::new(());
        request
            .headers_mut()
            .insert(GRPC_TIMEOUT_HEADER, HeaderValue::from_static("5m"));

        let header = service.oneshot(request).await.unwrap();
        assert_eq!(header, Some(HeaderValue::from_static("5m")));
    }

    #[tokio::test]
    async fn test_deadline_elapses_as_deadline_exceeded() {
        let service = DeadlineLayer::new(Duration::from_millis(20)).layer(tower::service_fn(
            |_request: http::Request<()>| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, Infallible>(())
            },
        ));

        let err = service.oneshot(http::Request::new(())).await.unwrap_err();
        let status = err.downcast::<Status>().unwrap();
        assert_eq!(status.code(), tonic::Code::DeadlineExceeded);
    }
}
