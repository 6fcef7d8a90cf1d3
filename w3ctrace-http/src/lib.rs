//! `traceparent` propagation over HTTP.
//!
//! [`HeaderExtractor`] and [`HeaderInjector`] plug an [`http::HeaderMap`] into
//! the carrier traits of [`w3ctrace::propagation`]. Clients call
//! [`inject_request`] before sending; servers either call [`extract_request`]
//! themselves or wrap their service in a [`TraceLayer`], which gives every
//! request handled below it a valid [`Trace`] unless the client sent an
//! unsupported version.
//!
//! ```
//! use http::Request;
//! use w3ctrace::Trace;
//! use w3ctrace_http::{extract_request, inject_request};
//!
//! let trace = Trace::new().ensure();
//! let mut request = Request::new(());
//! inject_request(&mut request, &trace);
//!
//! assert_eq!(extract_request(&request), Some(trace));
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(test, deny(warnings))]

use http::header::{HeaderName, HeaderValue};
use std::fmt;
use w3ctrace::propagation::{extract, inject, Extractor, Injector};
use w3ctrace::{w3c_debug, Trace};

mod layer;

pub use layer::{ResponseFuture, TraceLayer, TraceService};

/// Helper for injecting headers into HTTP Requests. This is used for
/// `traceparent` propagation over HTTP.
pub struct HeaderInjector<'a>(pub &'a mut http::HeaderMap);

impl Injector for HeaderInjector<'_> {
    /// Set a key and value in the HeaderMap. Does nothing if the key or value are not valid inputs.
    fn set(&mut self, key: &str, value: String) {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(val)) => {
                self.0.insert(name, val);
            }
            _ => {
                w3c_debug!(name: "HeaderInjector.InvalidHeader", key = key);
            }
        }
    }
}

impl fmt::Debug for HeaderInjector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HeaderInjector").field(&self.0.len()).finish()
    }
}

/// Helper for extracting headers from HTTP Requests. This is used for
/// `traceparent` propagation over HTTP.
pub struct HeaderExtractor<'a>(pub &'a http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    /// Get a value for a key from the HeaderMap. If the value is not valid ASCII, returns None.
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    /// Collect all the keys from the HeaderMap.
    fn keys(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(|value| value.as_str())
            .collect::<Vec<_>>()
    }

    /// Get every value of a key in the order received. Values that are not
    /// valid ASCII are skipped.
    fn get_all(&self, key: &str) -> Option<Vec<&str>> {
        let values = self
            .0
            .get_all(key)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>();
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }
}

impl fmt::Debug for HeaderExtractor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HeaderExtractor").field(&self.0.len()).finish()
    }
}

/// Read the trace a client sent with `request`, ignoring malformed headers.
pub fn extract_request<B>(request: &http::Request<B>) -> Option<Trace> {
    extract(&HeaderExtractor(request.headers()))
}

/// Set the `traceparent` header of `request`. An invalid trace leaves the
/// request untouched.
pub fn inject_request<B>(request: &mut http::Request<B>, trace: &Trace) {
    inject(trace, &mut HeaderInjector(request.headers_mut()));
}

/// The trace stored in request extensions by [`TraceService`].
#[derive(Clone, Copy, Debug)]
struct RequestTrace(Trace);

/// Access to the trace [`TraceLayer`] stored on a request.
pub trait RequestTraceExt {
    /// The trace of this request, `None` if it did not pass through a
    /// [`TraceService`].
    fn trace(&self) -> Option<Trace>;
}

impl<B> RequestTraceExt for http::Request<B> {
    fn trace(&self) -> Option<Trace> {
        self.extensions().get::<RequestTrace>().map(|stored| stored.0)
    }
}

impl RequestTraceExt for http::Extensions {
    fn trace(&self) -> Option<Trace> {
        self.get::<RequestTrace>().map(|stored| stored.0)
    }
}
