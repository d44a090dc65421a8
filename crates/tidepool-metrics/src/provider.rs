//! System load providers.
//!
//! The sampler never measures load itself; it asks a `SystemLoadProvider`.
//! Production wiring reads figures published by an external agent
//! (`JsonFileLoadProvider`); tests use `StaticLoadProvider` or their own
//! scripted implementation.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// System-level load figures reported by a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SystemLoad {
    /// CPU utilization, percent.
    pub cpu_utilization: f64,
    /// Memory utilization, percent.
    pub memory_utilization: f64,
    /// Average response time in milliseconds.
    pub response_time_ms: f64,
    /// Requests per second.
    pub throughput: f64,
    /// Error rate, percent.
    pub error_rate: f64,
}

/// Errors a provider may report.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("load source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed load document: {0}")]
    Malformed(String),
}

/// Source of system-level load figures.
pub trait SystemLoadProvider: Send + Sync {
    fn sample_system_load(&self) -> Result<SystemLoad, ProviderError>;
}

/// Provider returning a fixed, replaceable set of figures.
#[derive(Debug, Default)]
pub struct StaticLoadProvider {
    load: RwLock<SystemLoad>,
}

impl StaticLoadProvider {
    pub fn new(load: SystemLoad) -> Self {
        Self {
            load: RwLock::new(load),
        }
    }

    /// Replace the figures returned by subsequent samples.
    pub fn set(&self, load: SystemLoad) {
        *self.load.write().expect("load lock") = load;
    }
}

impl SystemLoadProvider for StaticLoadProvider {
    fn sample_system_load(&self) -> Result<SystemLoad, ProviderError> {
        Ok(*self.load.read().expect("load lock"))
    }
}

/// Provider that reads a JSON `SystemLoad` document on every sample.
///
/// An external agent rewrites the file; a missing or half-written file
/// surfaces as a provider error and the sampler falls back to its last
/// snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileLoadProvider {
    path: PathBuf,
}

impl JsonFileLoadProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SystemLoadProvider for JsonFileLoadProvider {
    fn sample_system_load(&self) -> Result<SystemLoad, ProviderError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::Unavailable(format!("{}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}
