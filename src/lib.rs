//! # HyEnv
//!
//! `hyenv` is a tower middleware which adds headers to HTTP requests and responses,
//! taking their values from environment variables.
//!
//! The environment is read once, when the [`EnvHeaderLayer`] is built. Every mapping
//! is validated at that point, so a constructed layer never fails while serving.
//!
//! ```no_run
//! use hyenv::{Config, EnvHeaderLayer, HeaderMapping};
//!
//! let config = Config::new()
//!     .request_header(HeaderMapping::required("X-Deployment", "DEPLOYMENT_NAME"))
//!     .response_header(HeaderMapping::optional("X-Served-By", "HOSTNAME"));
//!
//! let layer = EnvHeaderLayer::new("deployment-headers", &config)?;
//! # Ok::<(), hyenv::InvalidConfiguration>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod config;
pub mod env;
pub mod error;
pub mod headers;

pub use config::{Config, HeaderMapping, OptionalUnset};
pub use env::{Environment, ProcessEnvironment};
pub use error::{Direction, InvalidConfiguration, Reason};
pub use headers::{EnvHeader, EnvHeaderLayer, ResolvedHeader};
