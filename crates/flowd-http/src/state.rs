//! Shared application state for the axum router.

use std::path::PathBuf;
use std::sync::Arc;

use flowd_policy::PolicyBundle;

use crate::registry::RunRegistry;
use crate::sources::{InMemorySourceManager, SourceManager};

pub struct AppState {
    pub scripts_root: PathBuf,
    pub data_dir: PathBuf,
    pub registry: Arc<RunRegistry>,
    pub sources: Arc<dyn SourceManager>,
    pub policy: PolicyBundle,
    pub token: Option<String>,
    pub dev_mode: bool,
}

impl AppState {
    pub fn new(scripts_root: PathBuf, data_dir: PathBuf) -> Self {
        let policy = PolicyBundle::load_from_env().unwrap_or_else(|_| PolicyBundle::empty());
        Self {
            scripts_root,
            data_dir,
            registry: Arc::new(RunRegistry::new()),
            sources: Arc::new(InMemorySourceManager::default()),
            policy,
            token: std::env::var("FLWD_TOKEN").ok(),
            dev_mode: std::env::var("FLWD_DEV_MODE").as_deref() == Ok("1"),
        }
    }
}

pub type SharedState = Arc<AppState>;
