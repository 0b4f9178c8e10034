use crate::report::report_model::{RunSummary, StepOutcome, SuiteResult};

// ============================================================================
// Console reporter
// ============================================================================

/// Format one suite for terminal output.
///
/// Produces output like:
/// ```text
/// === Suite: Login ===
///
/// ✓ PASS  valid credentials (4 steps)
/// ✗ FAIL  wrong password (3 steps, 1 skipped)
///     [FAIL] Step 2: 「ようこそ」が表示されていることを確認 - expected text 'ようこそ' to be visible, observed no such text on the page
///            screenshot: outputs/wrong_password_001_20250101_120000.png
///
/// === Results: 1 passed, 1 failed (2 total) in 3.2s ===
/// ```
pub fn format_console_report(suite: &SuiteResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Suite: {} ===\n\n", suite.name));

    for case in &suite.case_results {
        let marker = if case.passed() {
            "\u{2713} PASS"
        } else {
            "\u{2717} FAIL"
        };

        let skipped = if case.steps_skipped > 0 {
            format!(", {} skipped", case.steps_skipped)
        } else {
            String::new()
        };

        out.push_str(&format!(
            "{}  {} ({} steps{})\n",
            marker,
            case.name,
            case.step_results.len(),
            skipped
        ));

        if let Some(ref error) = case.setup_error {
            out.push_str(&format!("    [SETUP] {}\n", error));
        }

        for step in case.failed_steps() {
            let detail = step
                .message
                .as_deref()
                .unwrap_or(step.outcome.label());
            out.push_str(&format!(
                "    [{}] Step {}: {} - {}\n",
                step.outcome.label(),
                step.index + 1,
                step.instruction,
                detail
            ));
            if step.retries_used > 0 && step.outcome == StepOutcome::Fail {
                out.push_str(&format!("           retries: {}\n", step.retries_used));
            }
            if let Some(ref path) = step.screenshot_path {
                out.push_str(&format!("           screenshot: {}\n", path.display()));
            }
        }
    }

    out.push_str(&format!(
        "\n=== Results: {} passed, {} failed ({} total)",
        suite.pass_count,
        suite.fail_count,
        suite.total()
    ));

    if let Some(ms) = suite.duration_ms {
        let secs = ms as f64 / 1000.0;
        out.push_str(&format!(" in {:.1}s", secs));
    }

    out.push_str(" ===\n");

    out
}

/// Format every suite, then the run totals and failing case names.
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    for suite in &summary.suite_results {
        out.push_str(&format_console_report(suite));
        out.push('\n');
    }

    if summary.suite_results.len() > 1 || !summary.failing_cases.is_empty() || summary.cancelled {
        out.push_str(&format!(
            "TOTAL: {} passed, {} failed ({} suites) in {:.1}s\n",
            summary.pass_count,
            summary.fail_count,
            summary.suite_results.len(),
            summary.duration_ms as f64 / 1000.0
        ));
        for name in &summary.failing_cases {
            out.push_str(&format!("  \u{2717} {}\n", name));
        }
        if summary.cancelled {
            out.push_str("Run was cancelled before completion.\n");
        }
    }
    out
}
