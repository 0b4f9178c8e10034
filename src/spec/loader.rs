use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::spec::spec_model::{Suite, SuiteFile};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("{path}: unsupported suite file extension (expected .yaml, .yml or .json)")]
    UnsupportedFormat { path: PathBuf },

    #[error("{path}: suite has no test cases")]
    Empty { path: PathBuf },

    #[error("no suite files found in {path}")]
    NoSuites { path: PathBuf },
}

fn is_suite_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml") | Some("json")
    )
}

/// Parse suite text; `format_hint` is a file extension.
pub fn parse_suite(content: &str, format_hint: &str, path: &Path) -> Result<Suite, LoadError> {
    let file: SuiteFile = match format_hint {
        "json" => serde_json::from_str(content).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        "yaml" | "yml" => serde_yaml::from_str(content).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        _ => {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
    };

    let suite = Suite::from(file);
    if suite.test_cases.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(suite)
}

/// Load one suite file.
pub fn load_suite(path: &Path) -> Result<Suite, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let content = fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let suite = parse_suite(&content, &ext, path)?;
    debug!(path = %path.display(), cases = suite.test_cases.len(), "loaded suite");
    Ok(suite)
}

/// Load a suite file, or every suite file directly inside a directory
/// (sorted by file name).
pub fn load_suites(path: &Path) -> Result<Vec<Suite>, LoadError> {
    if !path.is_dir() {
        return Ok(vec![load_suite(path)?]);
    }

    let entries = fs::read_dir(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_suite_file(p))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(LoadError::NoSuites {
            path: path.to_path_buf(),
        });
    }

    files.iter().map(|p| load_suite(p)).collect()
}
