use crate::{HeaderExtractor, HeaderInjector, RequestTrace};
use http::{Request, Response};
use pin_project_lite::pin_project;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tower::{Layer, Service};
use w3ctrace::context::{FutureContextExt, WithContext};
use w3ctrace::propagation::{extract, inject};
use w3ctrace::{Context, IdGenerator, TraceContextExt};

/// [`Layer`] that attaches a [`Trace`] to every request it can.
///
/// For each request the `traceparent` header is read permissively and
/// completed with [`Trace::ensure`], so a missing or garbled header yields a
/// fresh root trace instead of an error. A valid result is stored in the
/// request extensions, readable through [`RequestTraceExt`], and attached to
/// the current [`Context`] every time the inner service's future is polled.
/// A header with an unsupported version stays invalid after `ensure` and the
/// request goes through without a trace.
///
/// ```
/// use tower::Layer;
/// use w3ctrace_http::TraceLayer;
///
/// # let inner = tower::service_fn(|_: http::Request<()>| async {
/// #     Ok::<_, std::convert::Infallible>(http::Response::new(()))
/// # });
/// let service = TraceLayer::new().with_response_header(true).layer(inner);
/// # let _ = service;
/// ```
///
/// [`Trace`]: w3ctrace::Trace
/// [`Trace::ensure`]: w3ctrace::Trace::ensure
/// [`RequestTraceExt`]: crate::RequestTraceExt
#[derive(Clone, Debug, Default)]
pub struct TraceLayer {
    config: Config,
}

#[derive(Clone, Debug, Default)]
struct Config {
    response_header: bool,
    id_generator: Option<Arc<dyn IdGenerator>>,
}

impl TraceLayer {
    /// Creates a layer that does not echo the trace on responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo the request's trace in the `traceparent` header of the response.
    ///
    /// Off by default.
    pub fn with_response_header(mut self, enabled: bool) -> Self {
        self.config.response_header = enabled;
        self
    }

    /// Mint missing ids with `generator` instead of the default generator.
    pub fn with_id_generator<G: IdGenerator + 'static>(mut self, generator: G) -> Self {
        self.config.id_generator = Some(Arc::new(generator));
        self
    }
}

impl<S> Layer<S> for TraceLayer {
    type Service = TraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceService {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Middleware created by [`TraceLayer`].
#[derive(Clone, Debug)]
pub struct TraceService<S> {
    inner: S,
    config: Config,
}

impl<S> TraceService<S> {
    /// Wrap `inner` with the default [`TraceLayer`] settings.
    pub fn new(inner: S) -> Self {
        TraceLayer::new().layer(inner)
    }

    /// The wrapped service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consume the middleware, returning the wrapped service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TraceService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let extracted = extract(&HeaderExtractor(req.headers())).unwrap_or_default();
        let trace = match &self.config.id_generator {
            Some(generator) => extracted.ensure_with(generator.as_ref()),
            None => extracted.ensure(),
        };
        if trace.is_valid() {
            req.extensions_mut().insert(RequestTrace(trace));
        }

        let cx = Context::current_with_trace(trace);
        let future = {
            let _guard = cx.clone().attach();
            self.inner.call(req)
        };

        ResponseFuture {
            inner: FutureContextExt::with_context(future, cx),
            echo: self.config.response_header.then_some(trace),
        }
    }
}

pin_project! {
    /// Response future of [`TraceService`].
    pub struct ResponseFuture<F> {
        #[pin]
        inner: WithContext<F>,
        echo: Option<w3ctrace::Trace>,
    }
}

impl<F, ResBody, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let mut response = match this.inner.poll(cx) {
            Poll::Ready(Ok(response)) => response,
            other => return other,
        };
        if let Some(trace) = this.echo.take() {
            inject(&trace, &mut HeaderInjector(response.headers_mut()));
        }
        Poll::Ready(Ok(response))
    }
}

impl<F> fmt::Debug for ResponseFuture<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFuture")
            .field("context", self.inner.context())
            .field("echo", &self.echo)
            .finish()
    }
}
