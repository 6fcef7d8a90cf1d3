use crate::{from_incoming, MetadataInjector};
use std::sync::Arc;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use w3ctrace::propagation::inject;
use w3ctrace::{Context, IdGenerator, Trace, TraceContextExt};

/// The trace stored in request extensions by [`ServerInterceptor`].
#[derive(Clone, Copy, Debug)]
struct IncomingTrace(Trace);

/// Access to the trace [`ServerInterceptor`] stored on a request.
pub trait RequestTraceExt {
    /// The trace of this request, `None` if it did not pass through a
    /// [`ServerInterceptor`].
    fn trace(&self) -> Option<Trace>;

    /// A copy of the current context carrying the trace of this request.
    ///
    /// Handlers attach it, or wrap their work with
    /// [`FutureContextExt::with_context`], so that outgoing calls made by a
    /// [`ClientInterceptor`] forward the trace.
    ///
    /// [`FutureContextExt::with_context`]: w3ctrace::context::FutureContextExt::with_context
    fn trace_context(&self) -> Context {
        match self.trace() {
            Some(trace) => Context::current_with_trace(trace),
            None => Context::current(),
        }
    }
}

impl<T> RequestTraceExt for Request<T> {
    fn trace(&self) -> Option<Trace> {
        self.extensions().get::<IncomingTrace>().map(|stored| stored.0)
    }
}

/// Server side [`Interceptor`] attaching a trace to every request it can.
///
/// The `traceparent` metadata is read permissively and completed with
/// [`Trace::ensure`]. A valid result is stored in the request extensions where
/// the handler finds it through [`RequestTraceExt::trace`]. A trace with an
/// unsupported version stays invalid and is not stored. Requests are never
/// rejected.
#[derive(Clone, Debug, Default)]
pub struct ServerInterceptor {
    id_generator: Option<Arc<dyn IdGenerator>>,
}

impl ServerInterceptor {
    /// Create an interceptor minting missing ids with the default generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint missing ids with `generator` instead of the default generator.
    pub fn with_id_generator<G: IdGenerator + 'static>(mut self, generator: G) -> Self {
        self.id_generator = Some(Arc::new(generator));
        self
    }
}

impl Interceptor for ServerInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let incoming = from_incoming(&request);
        let trace = match &self.id_generator {
            Some(generator) => incoming.ensure_with(generator.as_ref()),
            None => incoming.ensure(),
        };
        if trace.is_valid() {
            request.extensions_mut().insert(IncomingTrace(trace));
        }
        Ok(request)
    }
}

/// Client side [`Interceptor`] sending the trace to the server.
///
/// By default the trace of the [`Context`] current when the call is made is
/// sent, and nothing when that context has none. [`with_trace`] pins a fixed
/// trace instead. An existing `traceparent` on the request is replaced.
///
/// [`with_trace`]: ClientInterceptor::with_trace
#[derive(Clone, Debug, Default)]
pub struct ClientInterceptor {
    trace: Option<Trace>,
}

impl ClientInterceptor {
    /// Create an interceptor forwarding the trace of the current context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always send `trace`. An invalid trace sends nothing.
    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }
}

impl Interceptor for ClientInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let trace = match self.trace {
            Some(trace) => Some(trace),
            None => Context::current().trace(),
        };
        if let Some(trace) = trace {
            inject(&trace, &mut MetadataInjector(request.metadata_mut()));
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use w3ctrace::id_generator::IncrementIdGenerator;
    use w3ctrace::propagation::TRACEPARENT_HEADER;
    use w3ctrace::{SpanId, TraceFlags, TraceId, Version};

    const HEADER: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn request_with(header: &'static str) -> Request<()> {
        let mut request = Request::new(());
        request.metadata_mut().insert(
            TRACEPARENT_HEADER,
            tonic::metadata::AsciiMetadataValue::from_static(header),
        );
        request
    }

    #[test]
    fn server_keeps_valid_trace() {
        let request = ServerInterceptor::new().call(request_with(HEADER)).unwrap();
        assert_eq!(request.trace(), Some(HEADER.parse().unwrap()));
    }

    #[test]
    fn server_ensures_missing_trace() {
        let mut interceptor = ServerInterceptor::new().with_id_generator(IncrementIdGenerator::new());
        let request = interceptor.call(Request::new(())).unwrap();

        let trace = request.trace().unwrap();
        assert!(trace.is_valid());
        assert_eq!(trace.parent_id(), SpanId::from(1));
        assert_eq!(trace.trace_id(), TraceId::from(2));
    }

    #[test]
    fn server_skips_unsupported_version() {
        const UNSUPPORTED: &str = "01-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

        let ensured = from_incoming(&request_with(UNSUPPORTED)).ensure();
        assert_eq!(ensured.version(), Version::from_u8(1));
        assert_eq!(ensured.parent_id(), SpanId::from(0x00f0_67aa_0ba9_02b7));
        assert_eq!(ensured.flags(), TraceFlags::SAMPLED);
        assert!(!ensured.is_valid());

        let request = ServerInterceptor::new().call(request_with(UNSUPPORTED)).unwrap();
        assert_eq!(request.trace(), None);
        assert_eq!(request.trace_context().trace(), None);
    }

    #[test]
    fn trace_absent_without_interceptor() {
        let request = request_with(HEADER);
        assert_eq!(request.trace(), None);
        assert_eq!(request.trace_context().trace(), None);
    }

    #[test]
    fn trace_context_carries_request_trace() {
        let request = ServerInterceptor::new().call(request_with(HEADER)).unwrap();
        assert_eq!(request.trace_context().trace(), Some(HEADER.parse().unwrap()));
    }

    #[test]
    fn client_sends_current_trace() {
        let trace: Trace = HEADER.parse().unwrap();
        let _guard = Context::current_with_trace(trace).attach();

        let request = ClientInterceptor::new().call(Request::new(())).unwrap();
        assert_eq!(request.metadata().get(TRACEPARENT_HEADER).unwrap(), HEADER);
    }

    #[test]
    fn client_without_trace_sends_nothing() {
        let request = ClientInterceptor::new().call(Request::new(())).unwrap();
        assert!(request.metadata().get(TRACEPARENT_HEADER).is_none());

        let request = ClientInterceptor::new()
            .with_trace(Trace::default())
            .call(Request::new(()))
            .unwrap();
        assert!(request.metadata().get(TRACEPARENT_HEADER).is_none());
    }

    #[test]
    fn client_fixed_trace_wins_and_replaces() {
        let fixed = Trace::new();
        let _guard = Context::current_with_trace(HEADER.parse().unwrap()).attach();

        let request = ClientInterceptor::new()
            .with_trace(fixed)
            .call(request_with(HEADER))
            .unwrap();
        let values = request
            .metadata()
            .get_all(TRACEPARENT_HEADER)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(values, vec![fixed.header()]);
    }

    #[test]
    fn client_to_server_round_trip() {
        let sent = Trace::new().ensure();
        let request = ClientInterceptor::new()
            .with_trace(sent)
            .call(Request::new(()))
            .unwrap();
        let request = ServerInterceptor::new().call(request).unwrap();
        assert_eq!(request.trace(), Some(sent));
    }
}
