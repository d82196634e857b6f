//! Configuration errors.

use std::fmt;

use thiserror::Error;

use crate::headers::InvalidField;

/// Whether a header is added to requests or to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Headers added to the incoming request.
    Request,

    /// Headers added to the outgoing response.
    Response,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Request => f.write_str("request"),
            Direction::Response => f.write_str("response"),
        }
    }
}

/// A header mapping could not be resolved.
///
/// Resolution stops at the first invalid mapping, so this always
/// describes exactly one mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{direction} header #{index} `{header}`: {reason}")]
pub struct InvalidConfiguration {
    direction: Direction,
    index: usize,
    header: String,
    reason: Reason,
}

impl InvalidConfiguration {
    pub(crate) fn new(
        direction: Direction,
        index: usize,
        header: impl Into<String>,
        reason: Reason,
    ) -> Self {
        Self {
            direction,
            index,
            header: header.into(),
            reason,
        }
    }

    /// Whether the mapping was a request or a response header.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Position of the mapping in its list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The configured header name, as written.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Why the mapping is invalid.
    pub fn reason(&self) -> &Reason {
        &self.reason
    }
}

/// Reasons a header mapping is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Reason {
    /// The header name is empty.
    #[error("missing header name")]
    MissingHeaderName,

    /// The header name is not an RFC 7230 token.
    #[error("{0}")]
    InvalidHeaderName(#[source] InvalidField),

    /// The environment variable name is empty.
    #[error("missing env reference")]
    MissingEnvReference,

    /// A required variable is unset or empty.
    #[error("required environment variable `{env}` is not set")]
    RequiredEnvUnset {
        /// The environment variable.
        env: String,
    },

    /// The variable holds characters which are not allowed in a header value.
    #[error("environment variable `{env}`: {source}")]
    InvalidHeaderValue {
        /// The environment variable.
        env: String,

        /// Where the value is invalid.
        source: InvalidField,
    },
}
