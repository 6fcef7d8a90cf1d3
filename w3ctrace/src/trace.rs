//! The trace value carried in `traceparent` and its textual codec.
use crate::error::{Field, ParseError};
use crate::id_generator::{IdGenerator, UlidIdGenerator};
use crate::{w3c_debug, SpanId, TraceFlags, TraceId, Version};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use const_hex::FromHexError;
use std::fmt;
use std::str::FromStr;

const WANT_PARTS: usize = 4;
const SHORT_LEN: usize = 22 + 1 + 11;

/// The correlation identifiers of one call chain.
///
/// A `Trace` is what travels in the `traceparent` header:
///
/// `traceparent: 00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01`
///
/// It has four fields:
///
///    - version
///    - trace-id
///    - parent-id
///    - trace-flags
///
/// A trace is [valid](Trace::is_valid) when its version is `00` and its trace
/// id is not all zeros. The parent id and the flags may be zero. The
/// [`Default`] trace is the invalid, all-zero one; use [`Trace::new`] for a
/// fresh root trace.
///
/// See the [w3c trace-context docs] for more details.
///
/// [w3c trace-context docs]: https://www.w3.org/TR/trace-context/#traceparent-header
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Trace {
    version: Version,
    trace_id: TraceId,
    parent_id: SpanId,
    flags: TraceFlags,
}

impl Trace {
    /// The invalid, all-zero trace.
    pub const NONE: Trace = Trace {
        version: Version::SUPPORTED,
        trace_id: TraceId::INVALID,
        parent_id: SpanId::INVALID,
        flags: TraceFlags::NOT_SAMPLED,
    };

    /// Create a fresh root trace: a newly generated trace id, no parent.
    pub fn new() -> Self {
        Trace {
            trace_id: UlidIdGenerator::default().new_trace_id(),
            ..Trace::NONE
        }
    }

    /// Construct a trace from its fields.
    pub const fn from_parts(
        version: Version,
        trace_id: TraceId,
        parent_id: SpanId,
        flags: TraceFlags,
    ) -> Self {
        Trace {
            version,
            trace_id,
            parent_id,
            flags,
        }
    }

    /// The format version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// The [`TraceId`] shared by every call in the chain.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The [`SpanId`] of the calling operation.
    pub fn parent_id(&self) -> SpanId {
        self.parent_id
    }

    /// The opaque trace flags.
    pub fn flags(&self) -> TraceFlags {
        self.flags
    }

    /// Returns a copy of this trace with another parent id.
    pub fn with_parent_id(self, parent_id: SpanId) -> Self {
        Trace { parent_id, ..self }
    }

    /// Returns a copy of this trace with other flags.
    pub fn with_flags(self, flags: TraceFlags) -> Self {
        Trace { flags, ..self }
    }

    /// Returns `true` if the version is supported and the trace id is not zero.
    pub fn is_valid(&self) -> bool {
        self.version.is_supported() && self.trace_id != TraceId::INVALID
    }

    /// Returns a trace with its ids populated.
    ///
    /// A valid trace is returned unchanged, even when its parent id is zero.
    /// Otherwise the trace id is replaced with a freshly generated one and a
    /// zero parent id is filled with a new span id. Version and flags are never
    /// touched, so a trace carrying an unsupported version stays invalid and
    /// gets a new trace id on every call.
    pub fn ensure(self) -> Self {
        self.ensure_with(&UlidIdGenerator::default())
    }

    /// Same as [`Trace::ensure`], drawing new ids from `generator`.
    pub fn ensure_with(self, generator: &dyn IdGenerator) -> Self {
        if self.is_valid() {
            return self;
        }

        let parent_id = if self.parent_id == SpanId::INVALID {
            generator.new_span_id()
        } else {
            self.parent_id
        };
        let ensured = Trace {
            version: self.version,
            trace_id: generator.new_trace_id(),
            parent_id,
            flags: self.flags,
        };
        w3c_debug!(
            name: "Trace.Ensure",
            trace_id = ensured.trace_id,
            parent_id = ensured.parent_id
        );
        ensured
    }

    /// The `traceparent` header value, or an empty string if the trace is not
    /// valid.
    ///
    /// An empty string means "nothing to send" and must not be parsed.
    ///
    /// # Examples
    ///
    /// ```
    /// use w3ctrace::Trace;
    ///
    /// let header = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
    /// let trace: Trace = header.parse().unwrap();
    /// assert_eq!(trace.header(), header);
    ///
    /// assert_eq!(Trace::default().header(), "");
    /// ```
    pub fn header(&self) -> String {
        if !self.is_valid() {
            return String::new();
        }
        self.to_string()
    }

    /// Compact form of the trace and parent ids: both in URL-safe base64
    /// without padding, joined by a `.`.
    ///
    /// Meant for embedding where hyphens are unwelcome. There is no parser for
    /// this form. Returns an empty string if the trace is not valid.
    pub fn short_string(&self) -> String {
        if !self.is_valid() {
            return String::new();
        }
        let mut short = String::with_capacity(SHORT_LEN);
        URL_SAFE_NO_PAD.encode_string(self.trace_id.to_bytes(), &mut short);
        short.push('.');
        URL_SAFE_NO_PAD.encode_string(self.parent_id.to_bytes(), &mut short);
        short
    }
}

impl fmt::Display for Trace {
    /// Writes the `traceparent` value, nothing for an invalid trace.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return Ok(());
        }
        write!(
            f,
            "{:02x}-{:032x}-{:016x}-{:02x}",
            self.version, self.trace_id, self.parent_id, self.flags
        )
    }
}

impl FromStr for Trace {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_string(s)
    }
}

/// Parse a `version-traceid-parentid-flags` value.
///
/// Each field must have exactly its width in hex digits (2, 32, 16 and 2). The
/// parser is structural only: any version is accepted and an all-zero trace id
/// parses fine, use [`Trace::is_valid`] to check the result.
pub fn parse_string(input: &str) -> Result<Trace, ParseError> {
    let parts = input.splitn(WANT_PARTS + 1, '-').collect::<Vec<&str>>();
    if parts.len() != WANT_PARTS {
        return Err(ParseError::PartCount {
            want: WANT_PARTS,
            got: parts.len(),
            input: input.to_owned(),
        });
    }

    for (field, part) in Field::ALL.into_iter().zip(&parts) {
        if part.len() != field.hex_len() {
            return Err(ParseError::FieldLength {
                field,
                want: field.hex_len(),
                got: part.len(),
                input: input.to_owned(),
            });
        }
    }

    let hex_error = |field: Field, value: &str| {
        let value = value.to_owned();
        move |source: FromHexError| ParseError::InvalidHex {
            field,
            value,
            input: input.to_owned(),
            source,
        }
    };

    let [version] = const_hex::decode_to_array::<_, 1>(parts[0])
        .map_err(hex_error(Field::Version, parts[0]))?;
    let trace_id = TraceId::from_hex(parts[1]).map_err(hex_error(Field::TraceId, parts[1]))?;
    let parent_id = SpanId::from_hex(parts[2]).map_err(hex_error(Field::ParentId, parts[2]))?;
    let [flags] =
        const_hex::decode_to_array::<_, 1>(parts[3]).map_err(hex_error(Field::Flags, parts[3]))?;

    Ok(Trace {
        version: Version::from_u8(version),
        trace_id,
        parent_id,
        flags: TraceFlags::new(flags),
    })
}
