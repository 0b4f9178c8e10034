use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::action::action_model::WaitFor;
use crate::browser::driver::{BrowserDriver, DriverFactory, ElementStatus};
use crate::browser::error::DriverError;

/// How to launch the browser server.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub node: String,
    pub script: String,
    pub headless: bool,
    pub timeout_ms: u64,
    /// Where screenshots are written
    pub output_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            node: "node".into(),
            script: "node/browser_server.js".into(),
            headless: true,
            timeout_ms: 30_000,
            output_dir: PathBuf::from("outputs"),
        }
    }
}

/// Request sent to browser_server.js over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum BrowserRequest<'a> {
    Navigate {
        url: &'a str,
    },
    Click {
        target: &'a str,
    },
    Fill {
        target: &'a str,
        value: &'a str,
    },
    Wait {
        until: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    Screenshot {
        path: &'a str,
    },
    Url,
    Title,
    TextPresent {
        text: &'a str,
    },
    ElementState {
        target: &'a str,
    },
    InputValue {
        target: &'a str,
    },
    CheckboxState {
        target: &'a str,
    },
    Quit,
}

impl<'a> BrowserRequest<'a> {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserRequest::Navigate { .. } => "navigate",
            BrowserRequest::Click { .. } => "click",
            BrowserRequest::Fill { .. } => "fill",
            BrowserRequest::Wait { .. } => "wait",
            BrowserRequest::Screenshot { .. } => "screenshot",
            BrowserRequest::Url => "url",
            BrowserRequest::Title => "title",
            BrowserRequest::TextPresent { .. } => "text_present",
            BrowserRequest::ElementState { .. } => "element_state",
            BrowserRequest::InputValue { .. } => "input_value",
            BrowserRequest::CheckboxState { .. } => "checkbox_state",
            BrowserRequest::Quit => "quit",
        }
    }

    pub fn wait(condition: &'a WaitFor) -> Self {
        match condition {
            WaitFor::Duration { ms } => BrowserRequest::Wait {
                until: "duration",
                ms: Some(*ms),
                text: None,
                target: None,
                timeout_ms: None,
            },
            WaitFor::PageLoad => BrowserRequest::Wait {
                until: "page_load",
                ms: None,
                text: None,
                target: None,
                timeout_ms: None,
            },
            WaitFor::TextVisible { text } => BrowserRequest::Wait {
                until: "text_visible",
                ms: None,
                text: Some(text),
                target: None,
                timeout_ms: None,
            },
            WaitFor::ElementVisible { target_desc } => BrowserRequest::Wait {
                until: "element_visible",
                ms: None,
                text: None,
                target: Some(target_desc),
                timeout_ms: None,
            },
        }
    }

    /// A wait that the server abandons after `timeout_ms`.
    pub fn bounded(self, limit: u64) -> Self {
        match self {
            BrowserRequest::Wait {
                until, ms, text, target, ..
            } => BrowserRequest::Wait {
                until,
                ms,
                text,
                target,
                timeout_ms: Some(limit),
            },
            other => other,
        }
    }
}

/// Response received from browser_server.js over stdout (one JSON line).
#[derive(Debug, Default, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Machine-readable failure class: element_not_found, navigation_timeout, timeout
    #[serde(default)]
    pub error_kind: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub present: Option<bool>,
    #[serde(default)]
    pub exists: Option<bool>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub checked: Option<bool>,
}

impl BrowserResponse {
    /// Map a failed response onto the driver error taxonomy.
    pub fn into_error(self, command: &str, subject: &str) -> DriverError {
        let error = self.error.unwrap_or_else(|| "unknown error".into());
        match self.error_kind.as_deref() {
            Some("element_not_found") => DriverError::ElementNotFound {
                target: subject.to_string(),
            },
            Some("navigation_timeout") => DriverError::NavigationTimeout {
                url: subject.to_string(),
            },
            Some("timeout") => DriverError::Timeout {
                command: command.to_string(),
            },
            _ => DriverError::Protocol {
                command: command.to_string(),
                error,
            },
        }
    }
}

/// A persistent browser page backed by browser_server.js.
///
/// Launches a long-lived Node.js process that keeps one Chromium page open.
/// Commands are sent as NDJSON over stdin, responses read from stdout.
pub struct BrowserSession {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    label: String,
    output_dir: PathBuf,
    screenshots_taken: u32,
    closed: bool,
}

impl BrowserSession {
    /// Launch a new browser session by spawning browser_server.js.
    pub fn launch(config: &SessionConfig, label: &str) -> Result<Self, DriverError> {
        let mut child = Command::new(&config.node)
            .arg(&config.script)
            .arg(if config.headless { "--headless" } else { "--headed" })
            .arg("--timeout")
            .arg(config.timeout_ms.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| DriverError::Spawn {
                script: config.script.clone(),
                source: e,
            })?;

        let (stdin, reader) = match Self::handshake(&mut child) {
            Ok(pipes) => pipes,
            Err(e) => {
                // Nothing else owns the process yet
                if let Err(kill_err) = child.kill() {
                    debug!(error = %kill_err, "browser server already exited");
                }
                let _ = child.wait();
                return Err(e);
            }
        };

        info!(label, headless = config.headless, "browser session ready");

        Ok(BrowserSession {
            child,
            stdin,
            reader,
            label: sanitize(label),
            output_dir: config.output_dir.clone(),
            screenshots_taken: 0,
            closed: false,
        })
    }

    /// Take the pipes and wait for the server's ready line.
    fn handshake(child: &mut Child) -> Result<(ChildStdin, BufReader<ChildStdout>), DriverError> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DriverError::SessionIo("failed to capture stdin of browser server".into()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::SessionIo("failed to capture stdout of browser server".into()))?;

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| DriverError::SessionIo(format!("failed to read ready signal: {}", e)))?;

        let response: BrowserResponse =
            serde_json::from_str(line.trim()).map_err(|e| DriverError::Json {
                context: "browser server ready signal".into(),
                source: e,
            })?;

        if !response.ok || response.ready != Some(true) {
            return Err(DriverError::Protocol {
                command: "launch".into(),
                error: response
                    .error
                    .unwrap_or_else(|| "did not receive ready signal".into()),
            });
        }
        Ok((stdin, reader))
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }

        let json = serde_json::to_string(request).map_err(|e| DriverError::Json {
            context: "browser request".into(),
            source: e,
        })?;
        debug!(request = %json, "browser command");

        writeln!(self.stdin, "{}", json)
            .map_err(|e| DriverError::SessionIo(format!("write to browser server: {}", e)))?;
        self.stdin
            .flush()
            .map_err(|e| DriverError::SessionIo(format!("flush browser server stdin: {}", e)))?;

        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| DriverError::SessionIo(format!("read from browser server: {}", e)))?;

        if line.trim().is_empty() {
            return Err(DriverError::SessionIo(
                "empty response from browser server (process may have died)".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| DriverError::Json {
            context: "browser server response".into(),
            source: e,
        })
    }

    /// Send a request and verify it succeeded.
    fn send_ok(&mut self, request: &BrowserRequest, subject: &str) -> Result<BrowserResponse, DriverError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(response.into_error(request.name(), subject));
        }
        Ok(response)
    }

    fn missing(command: &str, field: &str) -> DriverError {
        DriverError::Protocol {
            command: command.into(),
            error: format!("no {} in response", field),
        }
    }

    fn next_screenshot_path(&mut self) -> PathBuf {
        self.screenshots_taken += 1;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        self.output_dir.join(format!(
            "{}_{:03}_{}.png",
            self.label, self.screenshots_taken, stamp
        ))
    }
}

impl BrowserDriver for BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::Navigate { url }, url)?;
        Ok(())
    }

    fn click(&mut self, target_desc: &str) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::Click { target: target_desc }, target_desc)?;
        Ok(())
    }

    fn fill(&mut self, target_desc: &str, value: &str) -> Result<(), DriverError> {
        self.send_ok(
            &BrowserRequest::Fill {
                target: target_desc,
                value,
            },
            target_desc,
        )?;
        Ok(())
    }

    fn wait(&mut self, condition: &WaitFor) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::wait(condition), wait_subject(condition))?;
        Ok(())
    }

    fn wait_up_to(&mut self, condition: &WaitFor, timeout: Duration) -> Result<(), DriverError> {
        let request = BrowserRequest::wait(condition).bounded(timeout.as_millis().max(1) as u64);
        self.send_ok(&request, wait_subject(condition))?;
        Ok(())
    }

    fn screenshot(&mut self) -> Result<PathBuf, DriverError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            DriverError::SessionIo(format!(
                "create screenshot directory {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;
        let path = self.next_screenshot_path();
        let path_str = path.to_string_lossy().to_string();
        self.send_ok(&BrowserRequest::Screenshot { path: &path_str }, &path_str)?;
        Ok(path)
    }

    fn get_url(&mut self) -> Result<String, DriverError> {
        let response = self.send_ok(&BrowserRequest::Url, "page")?;
        response.url.ok_or_else(|| Self::missing("url", "url"))
    }

    fn get_title(&mut self) -> Result<String, DriverError> {
        let response = self.send_ok(&BrowserRequest::Title, "page")?;
        response.title.ok_or_else(|| Self::missing("title", "title"))
    }

    fn query_text_present(&mut self, text: &str) -> Result<bool, DriverError> {
        let response = self.send_ok(&BrowserRequest::TextPresent { text }, text)?;
        response
            .present
            .ok_or_else(|| Self::missing("text_present", "present"))
    }

    fn query_element_state(&mut self, target_desc: &str) -> Result<ElementStatus, DriverError> {
        let response = self.send_ok(&BrowserRequest::ElementState { target: target_desc }, target_desc)?;
        let exists = response.exists.unwrap_or(false);
        Ok(ElementStatus {
            exists,
            visible: exists && response.visible.unwrap_or(false),
        })
    }

    fn get_input_value(&mut self, target_desc: &str) -> Result<String, DriverError> {
        let response = self.send_ok(&BrowserRequest::InputValue { target: target_desc }, target_desc)?;
        response
            .value
            .ok_or_else(|| Self::missing("input_value", "value"))
    }

    fn get_checkbox_state(&mut self, target_desc: &str) -> Result<bool, DriverError> {
        let response =
            self.send_ok(&BrowserRequest::CheckboxState { target: target_desc }, target_desc)?;
        response
            .checked
            .ok_or_else(|| Self::missing("checkbox_state", "checked"))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        // Best-effort quit; the process may already be gone
        if let Err(e) = self.send(&BrowserRequest::Quit) {
            debug!(error = %e, "quit request failed");
        }
        self.closed = true;
        if let Err(e) = self.child.wait() {
            warn!(error = %e, "browser server did not exit cleanly");
        }
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Best-effort cleanup
        let _ = self.close();
    }
}

fn wait_subject(condition: &WaitFor) -> &str {
    match condition {
        WaitFor::TextVisible { text } => text.as_str(),
        WaitFor::ElementVisible { target_desc } => target_desc.as_str(),
        _ => "page",
    }
}

/// Keep screenshot file names portable.
fn sanitize(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "session".to_string()
    } else {
        cleaned
    }
}

/// Spawns one browser server per test case.
#[derive(Debug, Clone, Default)]
pub struct SessionFactory {
    pub config: SessionConfig,
}

impl SessionFactory {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

impl DriverFactory for SessionFactory {
    fn open(&self, label: &str) -> Result<Box<dyn BrowserDriver + Send>, DriverError> {
        Ok(Box::new(BrowserSession::launch(&self.config, label)?))
    }
}
