use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::browser::session::SessionConfig;
use crate::spec::runner::{FailurePolicy, RetryPolicy, RunOptions};

pub const DEFAULT_CONFIG_FILE: &str = "plaintest.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "plaintest",
    version,
    about = "Browser acceptance tests written as plain sentences"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: plaintest.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run suite files against a real browser
    Run {
        /// Suite files (YAML or JSON)
        files: Vec<PathBuf>,

        /// Directory of suite files, run in name order
        #[arg(long)]
        test_dir: Option<PathBuf>,

        /// Run the browser without a window
        #[arg(long, conflicts_with = "headed")]
        headless: bool,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,

        /// Use the keyword extractor instead of the model
        #[arg(long)]
        mock: bool,

        /// Keep running a case after a failed step
        #[arg(long)]
        robust: bool,

        /// Cases run concurrently, one browser each
        #[arg(long)]
        workers: Option<usize>,

        /// Where screenshots and summary.json are written
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
        format: ReportFormat,

        /// Append one JSON line per executed step to this file
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Cancel the run after this many seconds
        #[arg(long)]
        suite_timeout: Option<u64>,
    },

    /// Type instructions one at a time against a live browser
    Interactive {
        /// Page to open first; relative navigation resolves against it
        #[arg(long)]
        url: Option<String>,

        /// Run the browser without a window
        #[arg(long, conflicts_with = "headed")]
        headless: bool,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,

        /// Use the keyword extractor instead of the model
        #[arg(long)]
        mock: bool,
    },

    /// Print how instructions are understood, without a browser
    Parse {
        /// Instructions to parse
        #[arg(required = true)]
        instructions: Vec<String>,

        /// Use the keyword extractor instead of the model
        #[arg(long)]
        mock: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Junit,
    Html,
}

impl ReportFormat {
    /// File name inside the output directory; console goes to stdout.
    pub fn file_name(self) -> Option<&'static str> {
        match self {
            ReportFormat::Console => None,
            ReportFormat::Junit => Some("report.xml"),
            ReportFormat::Html => Some("report.html"),
        }
    }
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `plaintest.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub test: TestConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_node")]
    pub node: String,

    #[serde(default = "default_script")]
    pub script: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_browser_timeout")]
    pub timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            node: default_node(),
            script: default_script(),
            headless: true,
            timeout_ms: default_browser_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    #[serde(default = "default_backoff")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_true")]
    pub screenshot_on_failure: bool,

    #[serde(default)]
    pub robust: bool,

    #[serde(default = "default_workers")]
    pub workers: usize,

    pub suite_timeout_secs: Option<u64>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_backoff(),
            screenshot_on_failure: true,
            robust: false,
            workers: default_workers(),
            suite_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,

    #[serde(default)]
    pub mock: bool,

    /// When false, unmatched instructions become unknown without any extractor
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_ms: default_llm_timeout(),
            min_confidence: default_min_confidence(),
            mock: false,
            enabled: true,
        }
    }
}

// Serde default helpers
fn default_true() -> bool { true }
fn default_node() -> String { "node".to_string() }
fn default_script() -> String { "node/browser_server.js".to_string() }
fn default_browser_timeout() -> u64 { 30_000 }
fn default_output_dir() -> PathBuf { PathBuf::from("outputs") }
fn default_retry_count() -> u32 { 3 }
fn default_backoff() -> u64 { 250 }
fn default_workers() -> usize { 1 }
fn default_endpoint() -> String { "http://localhost:11434/api/generate".to_string() }
fn default_model() -> String { "qwen2.5:1.5b".to_string() }
fn default_llm_timeout() -> u64 { 10_000 }
fn default_min_confidence() -> f32 { 0.5 }
fn default_log_level() -> String { "info".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if the file is missing or malformed.
/// A config file that exists but cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Load the config file, or defaults when there is none.
///
/// Returns the error instead of logging it: this runs before the tracing
/// subscriber exists.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let config_path = Path::new(path.unwrap_or(DEFAULT_CONFIG_FILE));
    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content, config_path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Read {
            path: config_path.to_path_buf(),
            source: e,
        }),
    }
}

pub fn parse_config(content: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    // An empty file deserializes to unit, not a mapping.
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::Malformed {
        path: path.to_path_buf(),
        source: e,
    })
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Flags of `run` that override file values when given.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub headless: Option<bool>,
    pub mock: bool,
    pub robust: bool,
    pub workers: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub suite_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// CLI flags win over the file.
    pub fn apply(&mut self, overrides: &RunOverrides) {
        if let Some(headless) = overrides.headless {
            self.browser.headless = headless;
        }
        if overrides.mock {
            self.llm.mock = true;
        }
        if overrides.robust {
            self.test.robust = true;
        }
        if let Some(workers) = overrides.workers {
            self.test.workers = workers;
        }
        if let Some(dir) = &overrides.output_dir {
            self.test.output_dir = dir.clone();
        }
        if overrides.suite_timeout_secs.is_some() {
            self.test.suite_timeout_secs = overrides.suite_timeout_secs;
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            failure_policy: if self.test.robust {
                FailurePolicy::Robust
            } else {
                FailurePolicy::FailFast
            },
            retry: RetryPolicy {
                retry_count: self.test.retry_count,
                backoff_ms: self.test.retry_backoff_ms,
            },
            screenshot_on_failure: self.test.screenshot_on_failure,
            workers: self.test.workers.max(1),
            wait_timeout_ms: self.browser.timeout_ms,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            node: self.browser.node.clone(),
            script: self.browser.script.clone(),
            headless: self.browser.headless,
            timeout_ms: self.browser.timeout_ms,
            output_dir: self.test.output_dir.clone(),
        }
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.llm.timeout_ms)
    }

    pub fn suite_timeout(&self) -> Option<Duration> {
        self.test.suite_timeout_secs.map(Duration::from_secs)
    }
}
