//! JSON export of the monitor's histories.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use tidepool_state::{Alert, ScalingDecision, ScalingMetrics};

use crate::analysis::DecisionPatterns;

/// Export document written by `export_metrics`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsExport {
    /// Unix timestamp (seconds).
    pub export_timestamp: u64,
    pub metrics_history: Vec<ScalingMetrics>,
    pub decision_history: Vec<ScalingDecision>,
    pub alerts: Vec<Alert>,
    pub patterns: DecisionPatterns,
}

/// Write an export as pretty-printed JSON, creating parent directories.
pub fn write_export(path: &Path, export: &MetricsExport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(export)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Read an export produced by [`write_export`].
pub fn load_export(path: &Path) -> anyhow::Result<MetricsExport> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let export = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(export)
}
