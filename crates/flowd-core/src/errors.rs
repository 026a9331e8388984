//! Error taxonomy (§7). Each kind short-circuits at the boundary that
//! raises it; callers compose these into `anyhow::Error` the way
//! `assay-core`'s `RunError`/`ConfigError` do.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{arg}: {msg}")]
pub struct ArgError {
    pub arg: String,
    pub msg: String,
}

impl ArgError {
    pub fn new(arg: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            arg: arg.into(),
            msg: msg.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("open config {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("decode config {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid alias from={from:?} to={to:?}: {reason}")]
    InvalidAlias {
        from: String,
        to: String,
        reason: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("interpreter missing for job {job_id}")]
    InterpreterMissing { job_id: String },
    #[error("container runtime not found (looked for podman, docker)")]
    RuntimeMissing,
    #[error("invalid container run options: {0}")]
    InvalidRunOptions(String),
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("step {step} exited with code {code}")]
    NonZeroExit { step: String, code: i32 },
    #[error("step {step}: {message}")]
    Other { step: String, message: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cancelled")]
pub struct CancelledError;

#[derive(Debug, Error)]
#[error("transport error: status={status} body={body}")]
pub struct TransportError {
    pub status: u16,
    pub body: String,
}
