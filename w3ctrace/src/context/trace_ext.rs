//! Context extensions for the trace
use super::Context;
use crate::Trace;

/// Private key under which the trace is stored. Nothing outside this module
/// can name it, so no other value in a [`Context`] can collide with it.
#[derive(Debug)]
struct ContextTrace(Trace);

/// Methods for storing and retrieving the [`Trace`] of a [`Context`].
pub trait TraceContextExt {
    /// Returns a clone of the current context with `trace` attached.
    ///
    /// The current context is returned unchanged if `trace` is not valid.
    fn current_with_trace(trace: Trace) -> Self;

    /// Returns a copy of this context with `trace` attached.
    ///
    /// An invalid trace is never stored: the copy is returned without it, and
    /// any trace previously attached is kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use w3ctrace::{Context, Trace, TraceContextExt};
    ///
    /// let trace = Trace::new();
    /// let cx = Context::new().with_trace(trace);
    /// assert_eq!(cx.trace(), Some(trace));
    ///
    /// let cx = Context::new().with_trace(Trace::default());
    /// assert_eq!(cx.trace(), None);
    /// ```
    fn with_trace(&self, trace: Trace) -> Self;

    /// The trace attached to this context, `None` if there is none.
    fn trace(&self) -> Option<Trace>;

    /// Returns `true` if a trace is attached to this context.
    fn has_trace(&self) -> bool {
        self.trace().is_some()
    }
}

impl TraceContextExt for Context {
    fn current_with_trace(trace: Trace) -> Self {
        Context::map_current(|cx| cx.with_trace(trace))
    }

    fn with_trace(&self, trace: Trace) -> Self {
        if trace.is_valid() {
            self.with_value(ContextTrace(trace))
        } else {
            self.clone()
        }
    }

    fn trace(&self) -> Option<Trace> {
        self.get::<ContextTrace>().map(|stored| stored.0)
    }
}
