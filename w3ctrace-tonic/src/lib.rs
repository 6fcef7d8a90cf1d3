//! `traceparent` propagation over gRPC metadata.
//!
//! gRPC carries request and response headers as [`MetadataMap`]s.
//! [`MetadataExtractor`] and [`MetadataInjector`] plug them into the carrier
//! traits of [`w3ctrace::propagation`], and the functions and interceptors
//! here cover the usual flows:
//!
//! - client to server: [`append_trace`] or a [`ClientInterceptor`],
//! - server side: [`from_incoming`] or a [`ServerInterceptor`],
//! - server back to client: [`server_to_client_unary`] and
//!   [`server_to_client_streaming`].
//!
//! ```
//! use tonic::Request;
//! use w3ctrace::Trace;
//! use w3ctrace_tonic::{append_trace, from_incoming};
//!
//! let trace = Trace::new().ensure();
//! let mut request = Request::new(());
//! append_trace(&mut request, &trace);
//!
//! assert_eq!(from_incoming(&request), trace);
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

use futures_core::Stream;
use std::fmt;
use tonic::metadata::{AsciiMetadataValue, KeyRef, MetadataKey, MetadataMap};
use tonic::{Request, Response};
use w3ctrace::propagation::{extract, inject, Extractor, Injector, TRACEPARENT_HEADER};
use w3ctrace::{w3c_debug, Trace};

mod interceptor;

pub use interceptor::{ClientInterceptor, RequestTraceExt, ServerInterceptor};

/// Helper for injecting `traceparent` into gRPC metadata.
pub struct MetadataInjector<'a>(pub &'a mut MetadataMap);

impl Injector for MetadataInjector<'_> {
    /// Set a key and value in the MetadataMap. Does nothing if the key or value are not valid inputs.
    fn set(&mut self, key: &str, value: String) {
        match (
            MetadataKey::from_bytes(key.to_lowercase().as_bytes()),
            value.parse::<AsciiMetadataValue>(),
        ) {
            (Ok(key), Ok(val)) => {
                self.0.insert(key, val);
            }
            _ => {
                w3c_debug!(name: "MetadataInjector.InvalidMetadata", key = key);
            }
        }
    }
}

impl fmt::Debug for MetadataInjector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MetadataInjector").field(&self.0.len()).finish()
    }
}

/// Helper for extracting `traceparent` from gRPC metadata.
pub struct MetadataExtractor<'a>(pub &'a MetadataMap);

impl Extractor for MetadataExtractor<'_> {
    /// Get a value for a key from the MetadataMap. If the value can't be converted to &str, returns None.
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|metadata| metadata.to_str().ok())
    }

    /// Collect all the ASCII keys from the MetadataMap.
    fn keys(&self) -> Vec<&str> {
        self.0
            .keys()
            .filter_map(|key| match key {
                KeyRef::Ascii(key) => Some(key.as_str()),
                KeyRef::Binary(_) => None,
            })
            .collect::<Vec<_>>()
    }

    /// Get every ASCII value of a key in the order received.
    fn get_all(&self, key: &str) -> Option<Vec<&str>> {
        let values = self
            .0
            .get_all(key)
            .iter()
            .filter_map(|metadata| metadata.to_str().ok())
            .collect::<Vec<_>>();
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }
}

impl fmt::Debug for MetadataExtractor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MetadataExtractor").field(&self.0.len()).finish()
    }
}

/// Add `trace` to an outgoing client request.
///
/// The value is appended, so a request that already carries a `traceparent`
/// keeps it in front. An invalid trace leaves the request untouched.
pub fn append_trace<T>(request: &mut Request<T>, trace: &Trace) {
    if !trace.is_valid() {
        return;
    }
    match trace.header().parse::<AsciiMetadataValue>() {
        Ok(value) => {
            request.metadata_mut().append(TRACEPARENT_HEADER, value);
        }
        Err(_) => {
            w3c_debug!(name: "MetadataInjector.InvalidMetadata", key = TRACEPARENT_HEADER);
        }
    }
}

/// Read the trace a client sent with `request`.
///
/// Every `traceparent` value is tried in order and the first one that parses
/// wins. Returns the zero trace when none does; call [`Trace::ensure`] on the
/// result to get a usable one.
pub fn from_incoming<T>(request: &Request<T>) -> Trace {
    extract(&MetadataExtractor(request.metadata())).unwrap_or_default()
}

/// Send `trace` back to the client in the header of a unary response.
pub fn server_to_client_unary<T>(response: &mut Response<T>, trace: &Trace) {
    inject(trace, &mut MetadataInjector(response.metadata_mut()));
}

/// Send `trace` back to the client in the header of a streaming response.
///
/// Response headers are sent before the first message, so this has to be
/// called before the response is returned from the handler.
pub fn server_to_client_streaming<S: Stream>(response: &mut Response<S>, trace: &Trace) {
    inject(trace, &mut MetadataInjector(response.metadata_mut()));
}
