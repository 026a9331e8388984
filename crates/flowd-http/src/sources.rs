//! Source-package fetch subsystem pass-through. Out of scope for the
//! core (spec.md §1); modeled as a trait object so the HTTP layer has
//! something concrete to call through, with an in-memory stub default.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
}

#[async_trait]
pub trait SourceManager: Send + Sync {
    async fn list(&self) -> Vec<Source>;
    async fn add(&self, source: Source) -> Result<(), String>;
    async fn remove(&self, name: &str) -> Result<(), String>;
}

#[derive(Default)]
pub struct InMemorySourceManager {
    sources: RwLock<BTreeMap<String, Source>>,
}

#[async_trait]
impl SourceManager for InMemorySourceManager {
    async fn list(&self) -> Vec<Source> {
        self.sources.read().expect("source registry poisoned").values().cloned().collect()
    }

    async fn add(&self, source: Source) -> Result<(), String> {
        self.sources
            .write()
            .expect("source registry poisoned")
            .insert(source.name.clone(), source);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), String> {
        self.sources
            .write()
            .expect("source registry poisoned")
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| "not found".to_string())
    }
}
