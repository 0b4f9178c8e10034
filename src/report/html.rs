use crate::report::report_model::{RunSummary, StepOutcome};

// ============================================================================
// HTML reporter
// ============================================================================

/// Generate a self-contained HTML report.
///
/// Green/red header from the overall verdict, one section per suite, one
/// card per case listing every step. Inline CSS only.
pub fn generate_html_report(summary: &RunSummary) -> String {
    let all_passed = summary.all_passed();
    let header_color = if all_passed { "#4CAF50" } else { "#f44336" };
    let status_text = if summary.cancelled {
        "RUN CANCELLED"
    } else if all_passed {
        "ALL TESTS PASSED"
    } else {
        "SOME TESTS FAILED"
    };

    let mut sections = String::new();
    for suite in &summary.suite_results {
        sections.push_str(&format!(
            "<h2>{} <small>{} passed, {} failed</small></h2>\n",
            escape_html(&suite.name),
            suite.pass_count,
            suite.fail_count
        ));

        for case in &suite.case_results {
            let case_class = if case.passed() { "pass" } else { "fail" };
            let case_marker = if case.passed() { "\u{2713}" } else { "\u{2717}" };

            sections.push_str(&format!(
                r#"<div class="test-case {class}">
<h3>{marker} {name}</h3>
<p>Steps: {steps} | Skipped: {skipped} | {secs:.1}s</p>
"#,
                class = case_class,
                marker = case_marker,
                name = escape_html(&case.name),
                steps = case.step_results.len(),
                skipped = case.steps_skipped,
                secs = case.duration_ms as f64 / 1000.0,
            ));

            if let Some(ref error) = case.setup_error {
                sections.push_str(&format!(
                    "<p class=\"error\">Setup: {}</p>\n",
                    escape_html(error)
                ));
            }

            sections.push_str("<ol class=\"steps\">\n");
            for step in &case.step_results {
                let class = match step.outcome {
                    StepOutcome::Pass => "ok",
                    StepOutcome::Fail => "bad",
                    StepOutcome::Error => "err",
                };
                sections.push_str(&format!(
                    "<li class=\"{}\"><span class=\"tag\">{}</span> {} <code>{}</code>",
                    class,
                    step.outcome.label(),
                    escape_html(&step.instruction),
                    escape_html(&step.action.summary())
                ));
                if let Some(ref msg) = step.message {
                    sections.push_str(&format!("<br><em>{}</em>", escape_html(msg)));
                }
                if let Some(ref path) = step.screenshot_path {
                    let p = escape_html(&path.display().to_string());
                    sections.push_str(&format!("<br><a href=\"{p}\">{p}</a>"));
                }
                sections.push_str("</li>\n");
            }
            sections.push_str("</ol>\n</div>\n");
        }
    }

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>plaintest report</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Hiragino Sans", "Noto Sans CJK SC", sans-serif; margin: 0; padding: 0; background: #f5f5f5; }}
.header {{ background: {header_color}; color: white; padding: 20px 30px; }}
.header h1 {{ margin: 0 0 8px 0; font-size: 24px; }}
.header p {{ margin: 0; font-size: 16px; opacity: 0.9; }}
.content {{ max-width: 960px; margin: 20px auto; padding: 0 20px; }}
h2 small {{ font-weight: normal; color: #666; font-size: 14px; }}
.test-case {{ background: white; border-radius: 6px; padding: 16px 20px; margin-bottom: 12px; border-left: 4px solid #ccc; }}
.test-case.pass {{ border-left-color: #4CAF50; }}
.test-case.fail {{ border-left-color: #f44336; }}
.test-case h3 {{ margin: 0 0 8px 0; font-size: 16px; }}
.test-case p {{ margin: 4px 0; color: #666; font-size: 14px; }}
.test-case .error {{ color: #f44336; font-weight: bold; }}
.steps {{ margin: 8px 0 0 0; padding-left: 20px; font-size: 13px; }}
.steps li {{ margin-bottom: 4px; }}
.steps .tag {{ font-weight: bold; }}
.steps .ok .tag {{ color: #2e7d32; }}
.steps .bad, .steps .err {{ color: #c62828; }}
</style>
</head>
<body>
<div class="header">
<h1>{status_text}</h1>
<p>{passed} passed, {failed} failed ({total} total) in {secs:.1}s</p>
</div>
<div class="content">
{sections}
</div>
</body>
</html>"##,
        header_color = header_color,
        status_text = status_text,
        passed = summary.pass_count,
        failed = summary.fail_count,
        total = summary.total(),
        secs = summary.duration_ms as f64 / 1000.0,
        sections = sections,
    )
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
