use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::agent::ai_model::OllamaBackend;
use crate::agent::extractor::{MockExtractor, ModelExtractor};
use crate::browser::driver::DriverFactory;
use crate::browser::session::SessionFactory;
use crate::cli::config::{AppConfig, ReportFormat};
use crate::compile::compiler::InstructionCompiler;
use crate::report::console::format_run_summary;
use crate::report::html::generate_html_report;
use crate::report::json::write_summary;
use crate::report::junit::generate_junit_xml;
use crate::report::report_model::RunSummary;
use crate::spec::cancel::CancelToken;
use crate::spec::interactive::run_interactive;
use crate::spec::loader::load_suites;
use crate::spec::runner::TestRunner;
use crate::spec::spec_model::Suite;
use crate::trace::logger::TraceLogger;

/// Exit code when the run could not be carried out at all.
pub const EXIT_INFRA: i32 = 2;

// ============================================================================
// run subcommand
// ============================================================================

/// Where the suites of a `run` come from.
#[derive(Debug, Clone, Default)]
pub struct SuiteSources {
    pub files: Vec<PathBuf>,
    pub test_dir: Option<PathBuf>,
}

/// Run suites and return the process exit code.
pub fn cmd_run(
    sources: &SuiteSources,
    config: &AppConfig,
    format: ReportFormat,
    trace_path: Option<&Path>,
    cancel: CancelToken,
) -> Result<i32, Box<dyn std::error::Error>> {
    let suites = collect_suites(sources)?;
    if suites.is_empty() {
        return Err("no suite files given (pass files or --test-dir)".into());
    }

    let compiler = build_compiler(config, config.llm.mock);
    let factory = SessionFactory::new(config.session_config());
    let trace = match trace_path {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };

    let cases: usize = suites.iter().map(|s| s.test_cases.len()).sum();
    info!(
        suites = suites.len(),
        cases,
        workers = config.test.workers,
        extractor = compiler.has_extractor(),
        "starting run"
    );

    let runner = TestRunner::new(&compiler, config.run_options())
        .with_cancel(cancel)
        .with_trace(&trace);

    let summary = match runner.run_all(&suites, &factory) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Run aborted: {}", e);
            return Ok(EXIT_INFRA);
        }
    };

    emit_report(&summary, format, &config.test.output_dir)?;

    match write_summary(&summary, &config.test.output_dir) {
        Ok(path) => info!(path = %path.display(), "summary written"),
        Err(e) => warn!(error = %e, "could not write summary.json"),
    }

    Ok(summary.exit_code())
}

/// Load every suite named on the command line, files first, then the directory.
pub fn collect_suites(sources: &SuiteSources) -> Result<Vec<Suite>, Box<dyn std::error::Error>> {
    let mut suites = Vec::new();
    for file in &sources.files {
        suites.extend(load_suites(file)?);
    }
    if let Some(dir) = &sources.test_dir {
        suites.extend(load_suites(dir)?);
    }
    Ok(suites)
}

/// Print the console report or write the junit/html file into `output_dir`.
pub fn emit_report(
    summary: &RunSummary,
    format: ReportFormat,
    output_dir: &Path,
) -> std::io::Result<()> {
    let content = match format {
        ReportFormat::Console => {
            print!("{}", format_run_summary(summary));
            return Ok(());
        }
        ReportFormat::Junit => generate_junit_xml(summary),
        ReportFormat::Html => generate_html_report(summary),
    };

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format.file_name().unwrap_or("report.txt"));
    std::fs::write(&path, content)?;
    println!(
        "{} passed, {} failed. Report: {}",
        summary.pass_count,
        summary.fail_count,
        path.display()
    );
    Ok(())
}

// ============================================================================
// interactive subcommand
// ============================================================================

/// Open one browser and run instructions typed on stdin until `exit`.
pub fn cmd_interactive(
    config: &AppConfig,
    url: Option<&str>,
    cancel: CancelToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let compiler = build_compiler(config, config.llm.mock);
    let runner = TestRunner::new(&compiler, config.run_options()).with_cancel(cancel);
    let factory = SessionFactory::new(config.session_config());
    let mut driver = factory.open("interactive")?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let outcome = run_interactive(&runner, driver.as_mut(), url, stdin.lock(), &mut stdout);

    if let Err(e) = driver.close() {
        warn!(error = %e, "failed to close browser session");
    }
    outcome?;
    Ok(())
}

// ============================================================================
// parse subcommand
// ============================================================================

/// Print the ParseResult of each instruction as pretty JSON.
pub fn cmd_parse(
    instructions: &[String],
    config: &AppConfig,
    mock: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let compiler = build_compiler(config, mock || config.llm.mock);
    let results: Vec<_> = instructions
        .iter()
        .map(|instruction| {
            serde_json::json!({
                "instruction": instruction,
                "result": compiler.parse(instruction),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Rules always; then the keyword extractor, the model, or nothing.
pub fn build_compiler(config: &AppConfig, mock: bool) -> InstructionCompiler {
    let compiler = if mock {
        InstructionCompiler::with_extractor(Box::new(MockExtractor::new()))
    } else if config.llm.enabled {
        let backend = OllamaBackend::new(&config.llm.endpoint, &config.llm.model);
        InstructionCompiler::with_extractor(Box::new(ModelExtractor::new(Box::new(backend))))
    } else {
        InstructionCompiler::rules_only()
    };
    compiler
        .timeout(config.extraction_timeout())
        .min_confidence(config.llm.min_confidence)
}
