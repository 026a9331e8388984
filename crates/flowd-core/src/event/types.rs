//! Run event shape (§3 Data model) and the channels a step writer tags
//! its output with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    RunStart,
    RunFinish,
    StepStart,
    StepLog,
    StepFinish,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::RunStart => "run.start",
            EventType::RunFinish => "run.finish",
            EventType::StepStart => "step.start",
            EventType::StepLog => "step.log",
            EventType::StepFinish => "step.finish",
        }
    }
}

impl Serialize for EventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "run.start" => Ok(EventType::RunStart),
            "run.finish" => Ok(EventType::RunFinish),
            "step.start" => Ok(EventType::StepStart),
            "step.log" => Ok(EventType::StepLog),
            "step.finish" => Ok(EventType::StepFinish),
            other => Err(serde::de::Error::custom(format!("unknown event type {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub sequence: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}
