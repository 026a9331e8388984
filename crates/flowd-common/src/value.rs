//! The dynamic value type bound arguments are represented as (§9 Design
//! Notes: "Dynamic value typing").

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bound argument value. Tagged over the concrete scalar/collection
/// kinds the argument schema (C3) supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
    StringList(Vec<String>),
    StringMap(BTreeMap<String, String>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            Value::StringList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_string_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Value::StringMap(m) => Some(m),
            _ => None,
        }
    }

    /// Render for env/shell-binding purposes: scalars print bare, lists
    /// and maps are not representable as a single scalar and return
    /// `None` (callers handle those shapes separately).
    pub fn as_scalar_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::StringList(_) | Value::StringMap(_) => None,
        }
    }
}

/// `ARG_<UPPER_SNAKE(name)>` env-name normalisation used throughout the
/// binder, profile-script synthesis, and plan builder.
pub fn env_key_for_arg(name: &str) -> String {
    let upper: String = name
        .chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() })
        .collect();
    format!("ARG_{upper}")
}
