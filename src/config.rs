//! Declarative configuration for environment headers.
//!
//! The configuration is usually deserialized from the host proxy's own
//! configuration file:
//!
//! ```yaml
//! requestHeaders:
//!   - header: X-Deployment
//!     env: DEPLOYMENT_NAME
//! responseHeaders:
//!   - header: X-Served-By
//!     env: HOSTNAME
//!     optional: true
//! ```

use serde::{Deserialize, Serialize};

/// Configuration for the [`EnvHeaderLayer`](crate::EnvHeaderLayer).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Headers appended to every request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_headers: Vec<HeaderMapping>,

    /// Headers appended to every response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_headers: Vec<HeaderMapping>,

    /// What to do with optional headers whose variable is unset or empty.
    #[serde(default)]
    pub optional_unset: OptionalUnset,
}

impl Config {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping for a request header.
    pub fn request_header(mut self, mapping: HeaderMapping) -> Self {
        self.request_headers.push(mapping);
        self
    }

    /// Add a mapping for a response header.
    pub fn response_header(mut self, mapping: HeaderMapping) -> Self {
        self.response_headers.push(mapping);
        self
    }

    /// Set the policy for optional headers whose variable is unset.
    pub fn optional_unset(mut self, policy: OptionalUnset) -> Self {
        self.optional_unset = policy;
        self
    }
}

/// Maps a header to the environment variable holding its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMapping {
    /// The header field name.
    #[serde(default)]
    pub header: String,

    /// The name of the environment variable.
    #[serde(default)]
    pub env: String,

    /// Whether the header may be left out when the variable is unset or empty.
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl HeaderMapping {
    /// A header whose variable must be set to a non-empty value.
    pub fn required(header: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            env: env.into(),
            optional: false,
        }
    }

    /// A header whose variable may be unset.
    pub fn optional(header: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            env: env.into(),
            optional: true,
        }
    }
}

/// Handling of optional headers whose environment variable is unset or empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionalUnset {
    /// Do not add the header at all.
    #[default]
    Skip,

    /// Add the header with an empty value.
    Empty,
}
