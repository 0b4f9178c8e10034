use std::fs;
use std::path::{Path, PathBuf};

use crate::report::report_model::RunSummary;

pub const SUMMARY_FILE: &str = "summary.json";

/// Write `summary.json` into `output_dir`, creating the directory if needed.
pub fn write_summary(summary: &RunSummary, output_dir: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(SUMMARY_FILE);
    let json = serde_json::to_string_pretty(summary).map_err(std::io::Error::other)?;
    fs::write(&path, json)?;
    Ok(path)
}

pub fn read_summary(path: &Path) -> std::io::Result<RunSummary> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}
