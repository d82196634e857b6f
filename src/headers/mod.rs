//! Header grammar and environment header middleware.

mod field;
pub mod inject;
mod parser;
mod resolve;

pub use field::{parse_header_name, parse_header_value, InvalidField};
pub use inject::{EnvHeader, EnvHeaderLayer};
pub use resolve::ResolvedHeader;
