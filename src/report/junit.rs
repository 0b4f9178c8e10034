use crate::report::report_model::{RunSummary, StepOutcome, SuiteResult};

// ============================================================================
// JUnit XML reporter
// ============================================================================

fn suite_xml(suite: &SuiteResult) -> String {
    let time_attr = suite
        .duration_ms
        .map(|ms| format!(" time=\"{:.3}\"", ms as f64 / 1000.0))
        .unwrap_or_default();

    let errors = suite
        .case_results
        .iter()
        .filter(|c| {
            !c.passed() && (c.setup_error.is_some() || c.failed_steps().any(|s| s.outcome == StepOutcome::Error))
        })
        .count();

    let mut cases = String::new();
    for case in &suite.case_results {
        let time = format!("{:.3}", case.duration_ms as f64 / 1000.0);
        if case.passed() {
            cases.push_str(&format!(
                "    <testcase name=\"{}\" classname=\"{}\" time=\"{}\" />\n",
                escape_xml(&case.name),
                escape_xml(&suite.name),
                time
            ));
            continue;
        }

        let mut body_parts: Vec<String> = case
            .failed_steps()
            .map(|s| {
                let mut line = format!(
                    "Step {} [{}]: {}",
                    s.index + 1,
                    s.outcome.label(),
                    s.message.as_deref().unwrap_or(&s.instruction)
                );
                if let Some(path) = &s.screenshot_path {
                    line.push_str(&format!(" (screenshot: {})", path.display()));
                }
                line
            })
            .collect();
        if let Some(err) = &case.setup_error {
            body_parts.push(format!("Setup: {}", err));
        }

        let is_error = case.setup_error.is_some()
            || case.failed_steps().any(|s| s.outcome == StepOutcome::Error);
        let tag = if is_error { "error" } else { "failure" };
        let message = case
            .failure_summary()
            .unwrap_or_else(|| "case failed".to_string());

        cases.push_str(&format!(
            "    <testcase name=\"{name}\" classname=\"{class}\" time=\"{time}\">\n      <{tag} message=\"{message}\" type=\"{kind}\">{body}</{tag}>\n    </testcase>\n",
            name = escape_xml(&case.name),
            class = escape_xml(&suite.name),
            time = time,
            tag = tag,
            message = escape_xml(&message),
            kind = if is_error { "StepError" } else { "AssertionFailure" },
            body = escape_xml(&body_parts.join("\n")),
        ));
    }

    let failures = suite.fail_count - errors.min(suite.fail_count);
    format!(
        "  <testsuite name=\"{name}\" tests=\"{tests}\" failures=\"{failures}\" errors=\"{errors}\"{time}>\n{cases}  </testsuite>\n",
        name = escape_xml(&suite.name),
        tests = suite.total(),
        failures = failures,
        errors = errors,
        time = time_attr,
        cases = cases,
    )
}

/// Generate a JUnit XML report for CI systems (Jenkins, GitHub Actions, GitLab CI).
///
/// Produces standard JUnit XML with one `<testsuite>` per suite:
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <testsuites tests="2" failures="1" time="4.100">
///   <testsuite name="Login" tests="2" failures="1" errors="0" time="4.100">
///     <testcase name="valid" classname="Login" time="1.900" />
///     <testcase name="invalid" classname="Login" time="2.200">
///       <failure message="step 2 (...): expected ..." type="AssertionFailure">...</failure>
///     </testcase>
///   </testsuite>
/// </testsuites>
/// ```
pub fn generate_junit_xml(summary: &RunSummary) -> String {
    let suites: String = summary.suite_results.iter().map(suite_xml).collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testsuites tests=\"{tests}\" failures=\"{failures}\" time=\"{time:.3}\">\n{suites}</testsuites>\n",
        tests = summary.total(),
        failures = summary.fail_count,
        time = summary.duration_ms as f64 / 1000.0,
        suites = suites,
    )
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
