//! The typed argument schema (C3).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    String,
    Integer,
    Boolean,
    Array,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgFormat {
    Path,
    File,
    Directory,
    Secret,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: Option<ArgType>,
    #[serde(default)]
    pub format: Option<ArgFormat>,
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<JsonValue>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "enum")]
    pub enum_values: Vec<String>,
    #[serde(default)]
    pub items_type: Option<String>,
    #[serde(default)]
    pub items_enum: Vec<String>,
    #[serde(default)]
    pub value_type: Option<String>,
}

impl ArgSpec {
    pub fn arg_type(&self) -> ArgType {
        self.arg_type.unwrap_or(ArgType::String)
    }

    /// True for args whose value must never leak into `scalarEnv`,
    /// `plan.resolved_args`, or event messages (I2).
    pub fn is_secret(&self) -> bool {
        self.secret || self.format == Some(ArgFormat::Secret)
    }
}

pub type ArgSchema = Vec<ArgSpec>;
