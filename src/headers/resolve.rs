//! Resolve header mappings against the environment.

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::{HeaderMapping, OptionalUnset};
use crate::env::Environment;
use crate::error::{Direction, InvalidConfiguration, Reason};

use super::field::{parse_header_name, parse_header_value};

/// A header whose value has been read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl ResolvedHeader {
    /// The header name.
    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    /// The header value.
    pub fn value(&self) -> &HeaderValue {
        &self.value
    }

    /// Append this header, keeping any existing values with the same name.
    pub fn append_to(&self, headers: &mut HeaderMap) {
        headers.append(self.name.clone(), self.value.clone());
    }
}

/// Resolve every mapping in order, stopping at the first invalid one.
pub(crate) fn resolve_all<E>(
    direction: Direction,
    mappings: &[HeaderMapping],
    policy: OptionalUnset,
    env: &E,
) -> Result<Vec<ResolvedHeader>, InvalidConfiguration>
where
    E: Environment + ?Sized,
{
    let mut resolved = Vec::with_capacity(mappings.len());
    for (index, mapping) in mappings.iter().enumerate() {
        let header = resolve(mapping, policy, env).map_err(|reason| {
            InvalidConfiguration::new(direction, index, mapping.header.as_str(), reason)
        })?;

        match header {
            Some(header) => {
                tracing::debug!(%direction, header = %header.name, env = %mapping.env, "Resolved header");
                resolved.push(header);
            }
            None => {
                tracing::debug!(%direction, header = %mapping.header, env = %mapping.env, "Skipping optional header, variable is unset");
            }
        }
    }

    Ok(resolved)
}

fn resolve<E>(
    mapping: &HeaderMapping,
    policy: OptionalUnset,
    env: &E,
) -> Result<Option<ResolvedHeader>, Reason>
where
    E: Environment + ?Sized,
{
    if mapping.header.is_empty() {
        return Err(Reason::MissingHeaderName);
    }
    let name = parse_header_name(&mapping.header).map_err(Reason::InvalidHeaderName)?;

    if mapping.env.is_empty() {
        return Err(Reason::MissingEnvReference);
    }

    let value = env.var(&mapping.env).unwrap_or_default();
    if value.is_empty() {
        if !mapping.optional {
            return Err(Reason::RequiredEnvUnset {
                env: mapping.env.clone(),
            });
        }

        if policy == OptionalUnset::Skip {
            return Ok(None);
        }
    }

    let value = parse_header_value(value).map_err(|source| {
        Reason::InvalidHeaderValue {
            env: mapping.env.clone(),
            source,
        }
    })?;

    Ok(Some(ResolvedHeader { name, value }))
}
