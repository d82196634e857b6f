//! HTTP header field names and values.
//!
//! Names must be RFC 7230 tokens. Values may contain visible characters,
//! `obs-text`, spaces and horizontal tabs, but never other control characters
//! such as line breaks.
use core::fmt;

use bytes::Bytes;
use http::{HeaderName, HeaderValue};
use thiserror::Error;

use super::parser::{field_value, token, NoTail as _};

/// Parse a header field name.
pub fn parse_header_name(input: &str) -> Result<HeaderName, InvalidField> {
    let bytes = input.as_bytes();
    token(bytes)
        .no_tail()
        .map_err(|error| InvalidField::at("header name", bytes, error.input))?;

    HeaderName::from_bytes(bytes).map_err(|_| InvalidField::new("header name", 0))
}

/// Parse a header field value.
///
/// The bytes are shared with the resulting [`HeaderValue`], not copied.
pub fn parse_header_value(input: Bytes) -> Result<HeaderValue, InvalidField> {
    field_value(&input)
        .no_tail()
        .map_err(|error| InvalidField::at("header value", &input, error.input))?;

    HeaderValue::from_maybe_shared(input).map_err(|_| InvalidField::new("header value", 0))
}

/// An error indicating that a header field name or value was invalid.
///
/// Only the offset of the first offending byte is kept, so that the error
/// can be logged without leaking the field's contents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct InvalidField {
    kind: &'static str,
    position: usize,
}

impl InvalidField {
    fn new(kind: &'static str, position: usize) -> Self {
        Self { kind, position }
    }

    fn at(kind: &'static str, input: &[u8], remaining: &[u8]) -> Self {
        Self::new(kind, input.len() - remaining.len())
    }

    /// Byte offset of the first character which is not allowed.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for InvalidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {} at byte {}", self.kind, self.position)
    }
}
