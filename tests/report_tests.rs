use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use plaintest::action::action_model::{Action, ParseSource};
use plaintest::report::console::{format_console_report, format_run_summary};
use plaintest::report::html::{escape_html, generate_html_report};
use plaintest::report::json::{SUMMARY_FILE, read_summary, write_summary};
use plaintest::report::junit::{escape_xml, generate_junit_xml};
use plaintest::report::report_model::{
    CaseOutcome, CaseResult, EXIT_CANCELLED, EXIT_FAILED, EXIT_OK, RunAggregator, RunSummary,
    StepOutcome, StepResult, SuiteResult,
};

fn step(index: usize, instruction: &str, outcome: StepOutcome, message: Option<&str>) -> StepResult {
    StepResult {
        index,
        instruction: instruction.into(),
        description: None,
        action: Action::Screenshot,
        source: Some(ParseSource::Pattern),
        outcome,
        message: message.map(str::to_string),
        screenshot_path: None,
        started_at: Utc::now(),
        duration_ms: 12,
        retries_used: 0,
    }
}

fn passing_case(name: &str) -> CaseResult {
    CaseResult {
        name: name.into(),
        description: None,
        outcome: CaseOutcome::Passed,
        step_results: vec![step(0, "Take a screenshot", StepOutcome::Pass, None)],
        setup_error: None,
        steps_skipped: 0,
        duration_ms: 1900,
    }
}

fn failing_case(name: &str) -> CaseResult {
    let mut failed = step(
        1,
        "「ようこそ」が表示されている",
        StepOutcome::Fail,
        Some("expected text 'ようこそ' to be visible, observed no such text on the page"),
    );
    failed.screenshot_path = Some(PathBuf::from("outputs/bad_002.png"));
    failed.retries_used = 0;
    CaseResult {
        name: name.into(),
        description: None,
        outcome: CaseOutcome::Failed,
        step_results: vec![step(0, "Take a screenshot", StepOutcome::Pass, None), failed],
        setup_error: None,
        steps_skipped: 1,
        duration_ms: 2200,
    }
}

fn erroring_case(name: &str) -> CaseResult {
    CaseResult {
        name: name.into(),
        description: None,
        outcome: CaseOutcome::Failed,
        step_results: vec![step(
            0,
            "do a little dance",
            StepOutcome::Error,
            Some("could not interpret 'do a little dance': no rule matched the instruction"),
        )],
        setup_error: None,
        steps_skipped: 0,
        duration_ms: 5,
    }
}

fn summary() -> RunSummary {
    let login = SuiteResult::from_cases("Login", vec![passing_case("valid"), failing_case("bad")])
        .with_duration(4100);
    let misc = SuiteResult::from_cases("Misc <1>", vec![erroring_case("dance")]);
    RunSummary::from_suites(vec![login, misc], Duration::from_millis(4200), false)
}

// =========================================================================
// Aggregation
// =========================================================================

#[test]
fn test_summary_totals() {
    let s = summary();
    assert_eq!(s.total(), 3);
    assert_eq!(s.pass_count, 1);
    assert_eq!(s.fail_count, 2);
    assert_eq!(s.failing_cases, vec!["Login / bad", "Misc <1> / dance"]);
    assert_eq!(s.exit_code(), EXIT_FAILED);
}

#[test]
fn test_exit_codes() {
    let ok = RunSummary::from_suites(
        vec![SuiteResult::from_cases("s", vec![passing_case("a")])],
        Duration::ZERO,
        false,
    );
    assert_eq!(ok.exit_code(), EXIT_OK);
    assert!(ok.all_passed());

    let cancelled = RunSummary::from_suites(
        vec![SuiteResult::from_cases("s", vec![passing_case("a")])],
        Duration::ZERO,
        true,
    );
    assert_eq!(cancelled.exit_code(), EXIT_CANCELLED);
    assert!(!cancelled.all_passed());
}

#[test]
fn test_aggregator_orders_cases_by_index() {
    let aggregator = RunAggregator::new();
    aggregator.record_case(2, passing_case("c"));
    aggregator.record_case(0, passing_case("a"));
    aggregator.record_case(1, failing_case("b"));
    let suite = aggregator.finish_suite("s", Duration::from_millis(10));

    let names: Vec<&str> = suite.case_results.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(suite.pass_count, 2);

    aggregator.record_case(0, passing_case("next"));
    aggregator.finish_suite("t", Duration::from_millis(5));
    let run = aggregator.into_summary(Duration::from_millis(20), false);
    assert_eq!(run.suite_results.len(), 2);
    assert_eq!(run.suite_results[1].case_results[0].name, "next");
    assert_eq!(run.total(), 4);
}

#[test]
fn test_failure_summary_names_first_failed_step() {
    assert_eq!(passing_case("a").failure_summary(), None);
    assert_eq!(
        failing_case("b").failure_summary().unwrap(),
        "step 2 (「ようこそ」が表示されている): expected text 'ようこそ' to be visible, observed no such text on the page"
    );

    let mut setup = erroring_case("c");
    setup.step_results.clear();
    setup.setup_error = Some("navigate to https://x: timeout".into());
    assert_eq!(setup.failure_summary().unwrap(), "setup failed: navigate to https://x: timeout");
}

// =========================================================================
// Console
// =========================================================================

#[test]
fn test_console_report_lists_failures() {
    let s = summary();
    let out = format_console_report(&s.suite_results[0]);

    assert!(out.starts_with("=== Suite: Login ===\n"));
    assert!(out.contains("\u{2713} PASS  valid (1 steps)"));
    assert!(out.contains("\u{2717} FAIL  bad (2 steps, 1 skipped)"));
    assert!(out.contains("[FAIL] Step 2: 「ようこそ」が表示されている"));
    assert!(out.contains("screenshot: outputs/bad_002.png"));
    assert!(out.contains("=== Results: 1 passed, 1 failed (2 total) in 4.1s ==="));
}

#[test]
fn test_run_summary_totals_and_cancellation() {
    let mut s = summary();
    s.cancelled = true;
    let out = format_run_summary(&s);
    assert!(out.contains("=== Suite: Misc <1> ==="));
    assert!(out.contains("TOTAL: 1 passed, 2 failed (2 suites)"));
    assert!(out.contains("  \u{2717} Login / bad"));
    assert!(out.contains("Run was cancelled before completion."));
}

// =========================================================================
// JUnit
// =========================================================================

#[test]
fn test_junit_xml_structure() {
    let xml = generate_junit_xml(&summary());

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("<testsuites tests=\"3\" failures=\"2\" time=\"4.200\">"));
    assert!(xml.contains(
        "<testsuite name=\"Login\" tests=\"2\" failures=\"1\" errors=\"0\" time=\"4.100\">"
    ));
    assert!(xml.contains("<testcase name=\"valid\" classname=\"Login\" time=\"1.900\" />"));
    assert!(xml.contains("type=\"AssertionFailure\""));
    assert!(xml.contains("(screenshot: outputs/bad_002.png)"));
}

#[test]
fn test_junit_marks_uninterpretable_steps_as_errors() {
    let xml = generate_junit_xml(&summary());
    assert!(xml.contains("<testsuite name=\"Misc &lt;1&gt;\" tests=\"1\" failures=\"0\" errors=\"1\">"));
    assert!(xml.contains("<error message="));
    assert!(xml.contains("type=\"StepError\""));
    assert!(xml.contains("could not interpret &apos;do a little dance&apos;"));
}

#[test]
fn test_escape_xml() {
    assert_eq!(
        escape_xml(r#"<a href="x">'&'</a>"#),
        "&lt;a href=&quot;x&quot;&gt;&apos;&amp;&apos;&lt;/a&gt;"
    );
}

// =========================================================================
// HTML
// =========================================================================

#[test]
fn test_html_report_content() {
    let html = generate_html_report(&summary());
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("SOME TESTS FAILED"));
    assert!(html.contains("#f44336"));
    assert!(html.contains("Misc &lt;1&gt;"));
    assert!(html.contains("<span class=\"tag\">FAIL</span> 「ようこそ」が表示されている"));
    assert!(html.contains("<a href=\"outputs/bad_002.png\">"));
    assert!(html.contains("1 passed, 2 failed (3 total)"));
}

#[test]
fn test_html_report_all_passed_and_cancelled_headers() {
    let ok = RunSummary::from_suites(
        vec![SuiteResult::from_cases("s", vec![passing_case("a")])],
        Duration::ZERO,
        false,
    );
    let html = generate_html_report(&ok);
    assert!(html.contains("ALL TESTS PASSED"));
    assert!(html.contains("#4CAF50"));

    let cancelled = RunSummary { cancelled: true, ..ok };
    assert!(generate_html_report(&cancelled).contains("RUN CANCELLED"));
}

#[test]
fn test_escape_html() {
    assert_eq!(escape_html("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
}

// =========================================================================
// JSON summary
// =========================================================================

#[test]
fn test_summary_json_written_and_read_back() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("nested").join("outputs");
    let path = write_summary(&summary(), &out).unwrap();
    assert_eq!(path, out.join(SUMMARY_FILE));

    let back = read_summary(&path).unwrap();
    assert_eq!(back.pass_count, 1);
    assert_eq!(back.failing_cases, summary().failing_cases);
    let bad = &back.suite_results[0].case_results[1];
    assert_eq!(bad.step_results[1].outcome, StepOutcome::Fail);
    assert_eq!(bad.step_results[1].screenshot_path, Some(PathBuf::from("outputs/bad_002.png")));
}

#[test]
fn test_summary_json_field_names() {
    let value = serde_json::to_value(summary()).unwrap();
    let step = &value["suite_results"][0]["case_results"][1]["step_results"][1];
    assert_eq!(step["outcome"], "fail");
    assert_eq!(step["action"]["kind"], "screenshot");
    assert_eq!(step["source"], "pattern");
    assert!(step["started_at"].is_string());
}
