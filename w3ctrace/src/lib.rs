//! W3C `traceparent` generation, parsing and propagation.
//!
//! Every call that crosses a process boundary carries one header,
//! `traceparent`, which names the chain of calls it belongs to (the trace id)
//! and the operation that made the call (the parent id). This crate models
//! that value as a [`Trace`], turns it into text and back, mints the ids that
//! go into it, and moves it between headers and the in-process [`Context`].
//!
//! ```text
//! 00-0192a3b4c5d6e7f8a9b0c1d2e3f40516-00f067aa0ba902b7-01
//! │  │                                │                └ flags
//! │  │                                └ parent id, 8 bytes
//! │  └ trace id, 16 bytes
//! └ version
//! ```
//!
//! # Getting Started
//!
//! ```
//! use w3ctrace::{Context, Trace, TraceContextExt};
//! use w3ctrace::propagation::{extract, inject};
//! use std::collections::HashMap;
//!
//! // An incoming request, possibly without a usable header.
//! let mut incoming = HashMap::new();
//! incoming.insert("traceparent".to_string(), "garbage".to_string());
//!
//! // Parse permissively, then make sure there is a usable trace.
//! let trace = extract(&incoming).unwrap_or_default().ensure();
//! assert!(trace.is_valid());
//!
//! // Keep it around for the duration of the call...
//! let _guard = Context::current_with_trace(trace).attach();
//!
//! // ...and forward it on outgoing requests.
//! let mut outgoing = HashMap::new();
//! inject(&Context::current().trace().unwrap_or_default(), &mut outgoing);
//! assert_eq!(outgoing["traceparent"], trace.header());
//! ```
//!
//! # Crate Feature Flags
//!
//! * `internal-logs` (enabled by default): report swallowed propagation
//!   problems, like a malformed header, as `tracing` debug events.
//! * `testing`: exposes [`IncrementIdGenerator`] for predictable ids in tests.
//!
//! [`IncrementIdGenerator`]: id_generator::IncrementIdGenerator
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(
    docsrs,
    feature(doc_cfg, doc_auto_cfg),
    deny(rustdoc::broken_intra_doc_links)
)]
#![cfg_attr(test, deny(warnings))]

mod internal_logging;

pub mod context;

pub use context::{Context, ContextGuard, TraceContextExt};

mod error;

pub use error::{Field, ParseError};

pub mod id_generator;

pub use id_generator::{new_span_id, new_trace_id, IdGenerator, UlidIdGenerator};

pub mod propagation;

mod trace;

pub use trace::{parse_string, Trace};

mod trace_context;

pub use trace_context::{SpanId, TraceFlags, TraceId, Version};

#[cfg(feature = "internal-logs")]
#[doc(hidden)]
pub mod _private {
    pub use tracing::{debug, warn};
}
