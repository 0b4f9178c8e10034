use std::io::{self, BufRead, Write};

use tracing::info;

use crate::browser::driver::BrowserDriver;
use crate::report::report_model::StepOutcome;
use crate::spec::runner::TestRunner;
use crate::spec::spec_model::{Step, Suite, TestCase};

const PROMPT: &str = "instruction> ";

/// Words that end the session, compared case-insensitively.
const EXIT_WORDS: &[&str] = &["exit", "quit", "終了", "退出"];

/// Tally of one interactive session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractiveSummary {
    pub executed: usize,
    pub passed: usize,
}

/// Read instructions line by line and run each against one live page.
///
/// After every instruction the outcome and the page's title and URL are
/// printed. Ends on an exit word, end of input or cancellation. Relative
/// navigation resolves against `base_url`, which is also opened first.
pub fn run_interactive(
    runner: &TestRunner,
    driver: &mut dyn BrowserDriver,
    base_url: Option<&str>,
    input: impl BufRead,
    out: &mut impl Write,
) -> io::Result<InteractiveSummary> {
    let suite = Suite {
        name: "interactive".into(),
        base_url: base_url.map(str::to_string),
        test_cases: Vec::new(),
    };
    let case = TestCase::new("interactive", Vec::new());
    let mut summary = InteractiveSummary::default();

    writeln!(out, "Interactive mode. Type 'exit' to quit.")?;
    if let Some(url) = base_url {
        match driver.navigate(url) {
            Ok(()) => print_page(driver, out)?,
            Err(e) => writeln!(out, "  could not open {}: {}", url, e)?,
        }
    }

    let mut lines = input.lines();
    loop {
        if runner.is_cancelled() {
            break;
        }
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            break;
        };
        let instruction = line?;
        let instruction = instruction.trim();
        if instruction.is_empty() {
            continue;
        }
        if EXIT_WORDS.iter().any(|w| instruction.eq_ignore_ascii_case(w)) {
            break;
        }

        let result = runner.run_step(&suite, &case, summary.executed, &Step::new(instruction), driver);
        summary.executed += 1;

        writeln!(out, "  -> {}", result.action.summary())?;
        match result.outcome {
            StepOutcome::Pass => {
                summary.passed += 1;
                writeln!(out, "  [PASS]")?;
            }
            other => writeln!(
                out,
                "  [{}] {}",
                other.label(),
                result.message.as_deref().unwrap_or("")
            )?,
        }
        if let Some(path) = &result.screenshot_path {
            writeln!(out, "  screenshot: {}", path.display())?;
        }
        if !result.action.is_unknown() {
            print_page(driver, out)?;
        }
    }

    writeln!(
        out,
        "Interactive session ended: {} of {} instructions passed.",
        summary.passed, summary.executed
    )?;
    info!(executed = summary.executed, passed = summary.passed, "interactive session ended");
    Ok(summary)
}

fn print_page(driver: &mut dyn BrowserDriver, out: &mut impl Write) -> io::Result<()> {
    match (driver.get_title(), driver.get_url()) {
        (Ok(title), Ok(url)) => {
            writeln!(out, "  page: {}", title)?;
            writeln!(out, "  url:  {}", url)
        }
        (Err(e), _) | (_, Err(e)) => writeln!(out, "  page info unavailable: {}", e),
    }
}
