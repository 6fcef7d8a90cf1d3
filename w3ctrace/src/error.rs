use const_hex::FromHexError;
use std::fmt;
use thiserror::Error;

/// One of the four `traceparent` fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    /// The 1-byte format version.
    Version,
    /// The 16-byte trace id.
    TraceId,
    /// The 8-byte parent span id.
    ParentId,
    /// The 1-byte trace flags.
    Flags,
}

impl Field {
    /// Fields in the order they appear on the wire.
    pub const ALL: [Field; 4] = [Field::Version, Field::TraceId, Field::ParentId, Field::Flags];

    /// Width of the field in bytes.
    pub const fn byte_len(self) -> usize {
        match self {
            Field::Version | Field::Flags => 1,
            Field::TraceId => 16,
            Field::ParentId => 8,
        }
    }

    /// Width of the field in hex digits.
    pub const fn hex_len(self) -> usize {
        self.byte_len() * 2
    }

    /// Name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Field::Version => "version",
            Field::TraceId => "traceid",
            Field::ParentId => "parentid",
            Field::Flags => "flags",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a `traceparent` value is malformed.
///
/// Every variant that saw text keeps the raw input so the offending header can
/// be logged as it was received. A value that parses but carries an unsupported version or a
/// zero trace id is not an error, see [`Trace::is_valid`].
///
/// [`Trace::is_valid`]: crate::Trace::is_valid
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// The value does not split into exactly four `-` separated parts.
    #[error("wanted {want} parts, got {got} (from {input:?})")]
    PartCount {
        /// Expected number of parts, always 4.
        want: usize,
        /// Number of parts found, capped at `want + 1`.
        got: usize,
        /// The raw header value.
        input: String,
    },

    /// A field has the wrong number of hex digits.
    #[error("{field} must be {want} hex, got {got} (from {input:?})")]
    FieldLength {
        /// The offending field.
        field: Field,
        /// Expected number of hex digits.
        want: usize,
        /// Number of characters found.
        got: usize,
        /// The raw header value.
        input: String,
    },

    /// A field has the right length but is not hex.
    #[error("parse {field} as {value:?}: {source} (from {input:?})")]
    InvalidHex {
        /// The offending field.
        field: Field,
        /// The text of the field.
        value: String,
        /// The raw header value.
        input: String,
        /// The decoding failure.
        #[source]
        source: FromHexError,
    },

    /// The header is present but the carrier could not read its value as text.
    #[error("{key} is present but not valid text")]
    NotText {
        /// The header name.
        key: String,
    },
}

impl ParseError {
    /// The raw value that failed to parse, `None` when it was not text.
    pub fn input(&self) -> Option<&str> {
        match self {
            ParseError::PartCount { input, .. }
            | ParseError::FieldLength { input, .. }
            | ParseError::InvalidHex { input, .. } => Some(input),
            ParseError::NotText { .. } => None,
        }
    }
}
