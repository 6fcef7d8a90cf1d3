//! # W3C Trace Context Propagator
//!
use super::{extract, inject, Extractor, Injector, TRACEPARENT_HEADER};
use crate::context::{Context, TraceContextExt};
use crate::id_generator::{IdGenerator, UlidIdGenerator};
use std::sync::Arc;

/// Moves a [`Trace`] between [`Context`]s and carriers under the `traceparent`
/// header.
///
/// `extract` reads the header permissively. With [`with_ensure`] enabled the
/// extracted trace is completed by [`Trace::ensure`], so an inbound call ends up
/// with a valid trace in its context even when the peer sent none. A trace with
/// an unsupported version stays invalid after `ensure` and is not attached.
///
/// [`Trace`]: crate::Trace
/// [`Trace::ensure`]: crate::Trace::ensure
/// [`with_ensure`]: TraceContextPropagator::with_ensure
#[derive(Clone, Debug)]
pub struct TraceContextPropagator {
    ensure: Option<Arc<dyn IdGenerator>>,
}

impl Default for TraceContextPropagator {
    fn default() -> Self {
        TraceContextPropagator::new()
    }
}

impl TraceContextPropagator {
    /// Create a new `TraceContextPropagator` which only carries what it finds.
    pub fn new() -> Self {
        TraceContextPropagator { ensure: None }
    }

    /// Complete extracted traces with ids from the default generator.
    pub fn with_ensure(self) -> Self {
        self.with_id_generator(UlidIdGenerator::default())
    }

    /// Complete extracted traces with ids from `generator`.
    pub fn with_id_generator<G: IdGenerator + 'static>(mut self, generator: G) -> Self {
        self.ensure = Some(Arc::new(generator));
        self
    }

    /// Writes the trace of the current context into `injector`.
    pub fn inject(&self, injector: &mut dyn Injector) {
        Context::map_current(|cx| self.inject_context(cx, injector))
    }

    /// Writes the trace of `cx` into `injector`. Nothing is written if the
    /// context carries no trace.
    pub fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        if let Some(trace) = cx.trace() {
            inject(&trace, injector);
        }
    }

    /// Extracts a trace from `extractor` into a copy of the current context.
    pub fn extract(&self, extractor: &dyn Extractor) -> Context {
        Context::map_current(|cx| self.extract_with_context(cx, extractor))
    }

    /// Extracts a trace from `extractor` into a copy of `cx`.
    ///
    /// If nothing usable is found `cx` is returned unchanged, unless the
    /// propagator ensures traces, in which case a fresh one is attached. Only
    /// valid traces are ever attached.
    pub fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        let extracted = extract(extractor);
        let trace = match &self.ensure {
            Some(generator) => Some(extracted.unwrap_or_default().ensure_with(generator.as_ref())),
            None => extracted,
        };
        match trace {
            Some(trace) => cx.with_trace(trace),
            None => cx.clone(),
        }
    }

    /// The header names this propagator reads and writes.
    pub fn fields(&self) -> std::iter::Once<&'static str> {
        std::iter::once(TRACEPARENT_HEADER)
    }
}
