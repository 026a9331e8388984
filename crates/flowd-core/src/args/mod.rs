//! Typed argument schema (C3) and binder (C6).

pub mod binder;
pub mod flagbag;
pub mod schema;

pub use binder::{bind, Binding};
pub use flagbag::{FlagBag, MapFlagBag};
pub use schema::{ArgFormat, ArgSchema, ArgSpec, ArgType};
