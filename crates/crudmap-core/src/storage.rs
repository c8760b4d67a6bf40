//! Read/write analysis reports from disk.

use crate::report::{AnalysisResult, REPORT_VERSION};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CRUDMAP_DIR: &str = ".crudmap";
const REPORT_FILE: &str = "report.json";

/// Get the path to the crudmap directory for a given project root.
pub fn crudmap_dir(project_root: &Path) -> PathBuf {
    project_root.join(CRUDMAP_DIR)
}

/// Get the path to the saved report for a given project root.
pub fn report_file(project_root: &Path) -> PathBuf {
    crudmap_dir(project_root).join(REPORT_FILE)
}

/// Check if a saved report exists for the given project root.
pub fn report_exists(project_root: &Path) -> bool {
    report_file(project_root).exists()
}

/// Serialize a report to a pretty-printed JSON string.
pub fn to_json(result: &AnalysisResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize report to JSON")
}

/// Deserialize a report from a JSON string, checking its version.
pub fn from_json(json: &str) -> Result<AnalysisResult> {
    let result: AnalysisResult =
        serde_json::from_str(json).context("failed to deserialize report from JSON")?;
    if result.version != REPORT_VERSION {
        anyhow::bail!(
            "report version mismatch: expected {}, found {}",
            REPORT_VERSION,
            result.version
        );
    }
    Ok(result)
}

/// Load a saved report.
pub fn load(project_root: &Path) -> Result<AnalysisResult> {
    let path = report_file(project_root);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("failed to read report from {}", path.display()))?;
    from_json(&json)
}

/// Save a report, creating the .crudmap directory if needed.
pub fn save(project_root: &Path, result: &AnalysisResult) -> Result<()> {
    let dir = crudmap_dir(project_root);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;

    let path = report_file(project_root);
    let json = to_json(result)?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;

    Ok(())
}
