//! Panic recovery for gRPC handlers
//!
//! A panic inside a handler unwinds through the router future. The recovery
//! interceptor catches it, hands the payload to a recovery handler and turns
//! the returned `Status` into a normal gRPC error response, so the connection
//! and the server keep running.
//!
//! Streaming handlers do most of their work while the response body is
//! polled. The body is wrapped as well: a panic there ends the stream with
//! trailers carrying the recovered status.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use http_body::{Body, Frame};
use tonic::body::BoxBody;
use tonic::codegen::{http, Bytes};
use tonic::Status;

use super::chain::{BoxError, GrpcRequest, GrpcResponse, Interceptor, Next};
use crate::methods::CallInfo;

/// Maps a recovered panic payload to the status returned to the caller
pub type RecoveryHandler = Arc<dyn Fn(&CallInfo, &(dyn Any + Send)) -> Status + Send + Sync>;

#[derive(Clone)]
pub struct RecoveryInterceptor {
    handler: RecoveryHandler,
}

impl RecoveryInterceptor {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&CallInfo, &(dyn Any + Send)) -> Status + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl Default for RecoveryInterceptor {
    fn default() -> Self {
        Self::new(|_call, _panic| Status::internal("panic in handler"))
    }
}

impl Interceptor for RecoveryInterceptor {
    fn intercept(
        &self,
        call: CallInfo,
        request: GrpcRequest,
        next: Next,
    ) -> BoxFuture<'static, Result<GrpcResponse, BoxError>> {
        let handler = self.handler.clone();

        Box::pin(async move {
            match AssertUnwindSafe(next.run(request)).catch_unwind().await {
                Ok(response) => response.map(move |response| {
                    response.map(move |body| {
                        tonic::body::boxed(RecoveringBody::new(body, call, handler))
                    })
                }),
                Err(panic) => Ok(handler(&call, panic.as_ref()).into_http()),
            }
        })
    }
}

/// Response body that recovers from panics raised while it is polled
struct RecoveringBody {
    inner: BoxBody,
    call: CallInfo,
    handler: RecoveryHandler,
    recovered: bool,
}

impl RecoveringBody {
    fn new(inner: BoxBody, call: CallInfo, handler: RecoveryHandler) -> Self {
        Self {
            inner,
            call,
            handler,
            recovered: false,
        }
    }
}

impl Body for RecoveringBody {
    type Data = Bytes;
    type Error = Status;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Status>>> {
        let this = &mut *self;
        if this.recovered {
            return Poll::Ready(None);
        }

        let inner = &mut this.inner;
        match std::panic::catch_unwind(AssertUnwindSafe(|| Pin::new(inner).poll_frame(cx))) {
            Ok(poll) => poll,
            Err(panic) => {
                this.recovered = true;
                let status = (this.handler)(&this.call, panic.as_ref());
                let mut trailers = http::HeaderMap::new();
                match status.add_header(&mut trailers) {
                    Ok(()) => Poll::Ready(Some(Ok(Frame::trailers(trailers)))),
                    Err(status) => Poll::Ready(Some(Err(status))),
                }
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.recovered || self.inner.is_end_stream()
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
