use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use plaintest::action::action_model::{Action, ParseSource};
use plaintest::cli::commands::{SuiteSources, build_compiler, collect_suites, emit_report};
use plaintest::cli::config::{
    AppConfig, Cli, Commands, ConfigError, ReportFormat, RunOverrides, load_config, parse_config,
};
use plaintest::report::report_model::RunSummary;
use plaintest::spec::runner::FailurePolicy;

// =========================================================================
// Argument parsing
// =========================================================================

#[test]
fn test_run_arguments() {
    let cli = Cli::parse_from([
        "plaintest",
        "-vv",
        "--config",
        "ci.yaml",
        "run",
        "suites/login.yaml",
        "suites/smoke.yaml",
        "--headed",
        "--robust",
        "--workers",
        "4",
        "--format",
        "junit",
        "--suite-timeout",
        "600",
    ]);
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.config.as_deref(), Some("ci.yaml"));
    match cli.command {
        Commands::Run {
            files,
            headed,
            headless,
            robust,
            workers,
            format,
            suite_timeout,
            mock,
            ..
        } => {
            assert_eq!(
                files,
                vec![PathBuf::from("suites/login.yaml"), PathBuf::from("suites/smoke.yaml")]
            );
            assert!(headed);
            assert!(!headless);
            assert!(robust);
            assert!(!mock);
            assert_eq!(workers, Some(4));
            assert_eq!(format, ReportFormat::Junit);
            assert_eq!(suite_timeout, Some(600));
        }
        other => panic!("expected run, got {:?}", other),
    }
}

#[test]
fn test_headed_and_headless_conflict() {
    let result = Cli::try_parse_from(["plaintest", "run", "a.yaml", "--headed", "--headless"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_requires_an_instruction() {
    assert!(Cli::try_parse_from(["plaintest", "parse"]).is_err());
    let cli = Cli::parse_from(["plaintest", "parse", "3秒待つ", "--mock"]);
    match cli.command {
        Commands::Parse { instructions, mock } => {
            assert_eq!(instructions, vec!["3秒待つ".to_string()]);
            assert!(mock);
        }
        other => panic!("expected parse, got {:?}", other),
    }
}

#[test]
fn test_interactive_arguments() {
    let cli = Cli::parse_from(["plaintest", "interactive", "--url", "https://example.com", "--headed", "--mock"]);
    match cli.command {
        Commands::Interactive {
            url,
            headed,
            headless,
            mock,
        } => {
            assert_eq!(url.as_deref(), Some("https://example.com"));
            assert!(headed);
            assert!(!headless);
            assert!(mock);
        }
        other => panic!("expected interactive, got {:?}", other),
    }
    assert!(Cli::try_parse_from(["plaintest", "interactive", "--headed", "--headless"]).is_err());
}

#[test]
fn test_report_format_file_names() {
    assert_eq!(ReportFormat::Console.file_name(), None);
    assert_eq!(ReportFormat::Junit.file_name(), Some("report.xml"));
    assert_eq!(ReportFormat::Html.file_name(), Some("report.html"));
}

// =========================================================================
// Config file
// =========================================================================

#[test]
fn test_missing_config_gives_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let config = load_config(path.to_str()).unwrap();
    assert!(config.browser.headless);
    assert_eq!(config.test.retry_count, 3);
    assert_eq!(config.test.workers, 1);
    assert_eq!(config.llm.min_confidence, 0.5);
    assert_eq!(config.log_level, "info");
}

#[test]
fn test_partial_config_keeps_other_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plaintest.yaml");
    std::fs::write(
        &path,
        "browser:\n  headless: false\ntest:\n  retry_count: 1\n  workers: 3\nllm:\n  model: llama3\n  enabled: false\n",
    )
    .unwrap();

    let config = load_config(path.to_str()).unwrap();
    assert!(!config.browser.headless);
    assert_eq!(config.browser.timeout_ms, 30_000);
    assert_eq!(config.test.retry_count, 1);
    assert_eq!(config.test.workers, 3);
    assert!(config.test.screenshot_on_failure);
    assert_eq!(config.llm.model, "llama3");
    assert!(!config.llm.enabled);
    assert_eq!(config.llm.endpoint, "http://localhost:11434/api/generate");
}

#[test]
fn test_empty_config_gives_defaults() {
    let config = parse_config("  \n", Path::new("plaintest.yaml")).unwrap();
    assert_eq!(config.test.retry_count, 3);
}

#[test]
fn test_malformed_config_is_reported() {
    let err = parse_config("test: [1, 2", Path::new("plaintest.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Malformed { .. }));
    assert!(err.to_string().starts_with("malformed config file plaintest.yaml"));

    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "browser:\n  headless: [yes\n").unwrap();
    assert!(matches!(
        load_config(path.to_str()),
        Err(ConfigError::Malformed { .. })
    ));
}

#[test]
fn test_unreadable_config_is_reported() {
    let dir = tempdir().unwrap();
    let err = load_config(dir.path().to_str()).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

// =========================================================================
// Overrides and derived settings
// =========================================================================

#[test]
fn test_cli_overrides_win_over_file() {
    let mut config = parse_config("test:\n  workers: 2\n  robust: false\n", Path::new("x.yaml")).unwrap();
    config.apply(&RunOverrides {
        headless: Some(false),
        mock: true,
        robust: true,
        workers: Some(8),
        output_dir: Some(PathBuf::from("out")),
        suite_timeout_secs: Some(30),
    });

    assert!(!config.browser.headless);
    assert!(config.llm.mock);
    assert!(config.test.robust);
    assert_eq!(config.test.workers, 8);
    assert_eq!(config.test.output_dir, PathBuf::from("out"));
    assert_eq!(config.suite_timeout(), Some(Duration::from_secs(30)));
}

#[test]
fn test_absent_overrides_keep_file_values() {
    let mut config =
        parse_config("browser:\n  headless: false\ntest:\n  workers: 2\n", Path::new("x.yaml")).unwrap();
    config.apply(&RunOverrides::default());
    assert!(!config.browser.headless);
    assert_eq!(config.test.workers, 2);
    assert_eq!(config.suite_timeout(), None);
}

#[test]
fn test_run_options_from_config() {
    let mut config = AppConfig::default();
    config.test.workers = 0;
    config.test.robust = true;
    config.test.retry_count = 5;

    let options = config.run_options();
    assert_eq!(options.workers, 1);
    assert_eq!(options.failure_policy, FailurePolicy::Robust);
    assert_eq!(options.retry.retry_count, 5);
    assert_eq!(options.retry.backoff_ms, 250);
}

#[test]
fn test_session_config_follows_browser_and_output_settings() {
    let mut config = AppConfig::default();
    config.browser.headless = false;
    config.test.output_dir = PathBuf::from("artifacts");
    let session = config.session_config();
    assert!(!session.headless);
    assert_eq!(session.output_dir, PathBuf::from("artifacts"));
    assert_eq!(session.script, "node/browser_server.js");
}

// =========================================================================
// Command helpers
// =========================================================================

#[test]
fn test_build_compiler_variants() {
    let mut config = AppConfig::default();
    assert!(build_compiler(&config, true).has_extractor());

    config.llm.enabled = false;
    let rules_only = build_compiler(&config, false);
    assert!(!rules_only.has_extractor());

    let result = rules_only.parse("do a little dance");
    assert!(result.action.is_unknown());
    assert_eq!(result.source, ParseSource::Pattern);
}

#[test]
fn test_mock_compiler_falls_back_to_keywords() {
    let compiler = build_compiler(&AppConfig::default(), true);
    let result = compiler.parse("ちょっと待って");
    assert_eq!(result.action, Action::wait_ms(3000));
    assert_eq!(result.source, ParseSource::Llm);
}

#[test]
fn test_collect_suites_from_files_and_directory() {
    let dir = tempdir().unwrap();
    let suites_dir = dir.path().join("suites");
    std::fs::create_dir(&suites_dir).unwrap();
    std::fs::write(suites_dir.join("b.yaml"), "name: b\nsteps:\n  - 3秒待つ\n").unwrap();
    let single = dir.path().join("a.json");
    std::fs::write(&single, r#"{"name": "a", "steps": ["Take a screenshot"]}"#).unwrap();

    let suites = collect_suites(&SuiteSources {
        files: vec![single],
        test_dir: Some(suites_dir),
    })
    .unwrap();
    let names: Vec<&str> = suites.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_collect_suites_propagates_load_errors() {
    let dir = tempdir().unwrap();
    let result = collect_suites(&SuiteSources {
        files: vec![dir.path().join("missing.yaml")],
        test_dir: None,
    });
    assert!(result.is_err());
}

#[test]
fn test_emit_report_writes_file_formats() {
    let dir = tempdir().unwrap();
    let summary = RunSummary::from_suites(vec![], Duration::ZERO, false);

    emit_report(&summary, ReportFormat::Junit, dir.path()).unwrap();
    emit_report(&summary, ReportFormat::Html, dir.path()).unwrap();
    emit_report(&summary, ReportFormat::Console, dir.path()).unwrap();

    let xml = std::fs::read_to_string(dir.path().join("report.xml")).unwrap();
    assert!(xml.contains("<testsuites tests=\"0\""));
    assert!(dir.path().join("report.html").exists());
}
