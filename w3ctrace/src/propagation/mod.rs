//! # Propagation of `traceparent` across process boundaries
//!
//! A [`Trace`] leaves a process in the `traceparent` header of an outgoing
//! request and enters the next one the same way. Every transport stores that
//! header differently, so the functions here only talk to the carrier through
//! two small traits:
//!
//! - [`Injector`] writes a key and a value into an outgoing carrier.
//! - [`Extractor`] reads the values of a key from an incoming carrier, with
//!   case-insensitive keys the way header maps behave.
//!
//! `w3ctrace-http` implements them for `http::HeaderMap` and `w3ctrace-tonic`
//! for gRPC metadata. [`HashMap<String, String>`] works out of the box.
//!
//! Extraction is permissive: a missing or malformed header yields no trace
//! instead of an error, so a peer sending garbage never fails a request.
//! [`must_extract`] and [`parse_header`] surface the parse error for callers
//! who want it.
use crate::error::ParseError;
use crate::trace::{parse_string, Trace};
use crate::w3c_debug;
use std::collections::HashMap;

mod trace_context;

pub use trace_context::TraceContextPropagator;

/// The canonical header carrying the trace.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Injector provides an interface for adding fields from an underlying struct like `HashMap`
pub trait Injector {
    /// Add a key and value to the underlying data.
    fn set(&mut self, key: &str, value: String);
}

/// Extractor provides an interface for removing fields from an underlying struct like `HashMap`
pub trait Extractor {
    /// Get a value from a key from the underlying data.
    fn get(&self, key: &str) -> Option<&str>;

    /// Collect all the keys from the underlying data.
    fn keys(&self) -> Vec<&str>;

    /// Get all values from a key from the underlying data.
    fn get_all(&self, key: &str) -> Option<Vec<&str>> {
        self.get(key).map(|value| vec![value])
    }
}

impl<S: std::hash::BuildHasher> Injector for HashMap<String, String, S> {
    /// Set a key and value in the HashMap.
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_lowercase(), value);
    }
}

impl<S: std::hash::BuildHasher> Extractor for HashMap<String, String, S> {
    /// Get a value for a key from the HashMap.
    fn get(&self, key: &str) -> Option<&str> {
        self.get(&key.to_lowercase()).map(|v| v.as_str())
    }

    /// Collect all the keys from the HashMap.
    fn keys(&self) -> Vec<&str> {
        self.keys().map(|k| k.as_str()).collect::<Vec<_>>()
    }
}

/// Parse the `traceparent` header found in `extractor`.
///
/// Returns `Ok(None)` when the header is absent, so callers can tell a
/// request without a trace from one with a broken trace. When the carrier
/// holds several values only the first is considered. A header the carrier
/// holds but cannot read as text is [`ParseError::NotText`].
pub fn parse_header(extractor: &dyn Extractor) -> Result<Option<Trace>, ParseError> {
    match extractor.get(TRACEPARENT_HEADER) {
        Some(value) => parse_string(value.trim()).map(Some),
        None => absent_or_not_text(extractor),
    }
}

fn absent_or_not_text(extractor: &dyn Extractor) -> Result<Option<Trace>, ParseError> {
    let present = extractor
        .keys()
        .iter()
        .any(|key| key.eq_ignore_ascii_case(TRACEPARENT_HEADER));
    if present {
        Err(ParseError::NotText {
            key: TRACEPARENT_HEADER.to_string(),
        })
    } else {
        Ok(None)
    }
}

/// Extract the trace from an incoming carrier, ignoring anything malformed.
///
/// Every value of the header is tried in order. Empty values are skipped,
/// malformed ones are logged at debug level and skipped, and the first one
/// that parses wins. The result may still be [invalid](Trace::is_valid), use
/// [`Trace::ensure`] to get a usable one.
pub fn extract(extractor: &dyn Extractor) -> Option<Trace> {
    extractor
        .get_all(TRACEPARENT_HEADER)?
        .into_iter()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .find_map(|value| match parse_string(value) {
            Ok(trace) => Some(trace),
            Err(err) => {
                w3c_debug!(name: "Traceparent.ExtractFailed", error = err);
                None
            }
        })
}

/// Strict variant of [`extract`]: a malformed header is returned as an error.
///
/// `Ok(None)` still means the header is absent or only holds empty values.
/// A header whose values cannot be read as text is [`ParseError::NotText`].
pub fn must_extract(extractor: &dyn Extractor) -> Result<Option<Trace>, ParseError> {
    let Some(values) = extractor.get_all(TRACEPARENT_HEADER) else {
        return absent_or_not_text(extractor);
    };
    values
        .into_iter()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(parse_string)
        .transpose()
}

/// Write the trace into an outgoing carrier.
///
/// Nothing is written for an invalid trace: no empty or placeholder header.
pub fn inject(trace: &Trace, injector: &mut dyn Injector) {
    if trace.is_valid() {
        injector.set(TRACEPARENT_HEADER, trace.header());
    }
}
