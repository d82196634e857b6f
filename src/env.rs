//! Environment variable lookup.
//!
//! Header values are read through the [`Environment`] trait, so that the
//! process environment can be replaced by a plain map.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::hash::BuildHasher;

use bytes::Bytes;

/// A source of environment variables.
pub trait Environment {
    /// Look up the raw bytes of the variable `name`, returning `None` when it is not set.
    fn var(&self, name: &str) -> Option<Bytes>;
}

/// The environment of the current process.
///
/// On unix the value's bytes are kept as they are, so values which are not
/// UTF-8 still reach the header as `obs-text`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<Bytes> {
        std::env::var_os(name).map(|value| os_bytes(name, value))
    }
}

#[cfg(unix)]
fn os_bytes(_name: &str, value: OsString) -> Bytes {
    use std::os::unix::ffi::OsStringExt as _;

    Bytes::from(value.into_vec())
}

#[cfg(not(unix))]
fn os_bytes(name: &str, value: OsString) -> Bytes {
    match value.into_string() {
        Ok(value) => Bytes::from(value),
        Err(raw) => {
            tracing::warn!(env = name, "Environment variable is not valid UTF-8");
            Bytes::from(raw.to_string_lossy().into_owned())
        }
    }
}

impl<S: BuildHasher> Environment for HashMap<String, String, S> {
    fn var(&self, name: &str) -> Option<Bytes> {
        self.get(name).map(|value| Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl Environment for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<Bytes> {
        self.get(name).map(|value| Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl<S: BuildHasher> Environment for HashMap<String, Bytes, S> {
    fn var(&self, name: &str) -> Option<Bytes> {
        self.get(name).cloned()
    }
}

impl<E> Environment for &E
where
    E: Environment + ?Sized,
{
    fn var(&self, name: &str) -> Option<Bytes> {
        (**self).var(name)
    }
}
