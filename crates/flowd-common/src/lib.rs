//! Shared primitives used across the flowd workspace: data-directory
//! resolution (C1), the dynamic argument value type, and secret
//! redaction helpers.

pub mod paths;
pub mod redact;
pub mod value;

pub use value::{env_key_for_arg, Value};
