#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use plaintest::action::action_model::WaitFor;
use plaintest::browser::driver::{BrowserDriver, DriverFactory, ElementStatus};
use plaintest::browser::error::DriverError;

// =========================================================================
// Simulated page
// =========================================================================

/// Everything the fake driver reports about "the page".
#[derive(Debug, Clone, Default)]
pub struct PageState {
    pub url: String,
    pub title: String,
    pub texts: Vec<String>,
    pub elements: HashMap<String, ElementStatus>,
    pub inputs: HashMap<String, String>,
    pub checkboxes: HashMap<String, bool>,
}

impl PageState {
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.texts.push(text.into());
        self
    }

    pub fn with_element(mut self, name: &str, visible: bool) -> Self {
        self.elements.insert(
            name.into(),
            ElementStatus {
                exists: true,
                visible,
            },
        );
        self
    }

    pub fn with_input(mut self, name: &str, value: &str) -> Self {
        self.inputs.insert(name.into(), value.into());
        self.elements.insert(
            name.into(),
            ElementStatus {
                exists: true,
                visible: true,
            },
        );
        self
    }

    pub fn with_checkbox(mut self, name: &str, checked: bool) -> Self {
        self.checkboxes.insert(name.into(), checked);
        self
    }
}

/// Shared, ordered log of driver calls: (session label, call).
pub type CallLog = Arc<Mutex<Vec<(String, String)>>>;

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls_of(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
}

// =========================================================================
// Fake driver
// =========================================================================

/// In-memory browser. Records every call, serves `PageState`, and fails
/// commands on demand.
pub struct FakeDriver {
    pub label: String,
    pub page: PageState,
    log: CallLog,
    failures: HashMap<&'static str, VecDeque<DriverError>>,
    delays: HashMap<&'static str, Duration>,
    screenshot_dir: PathBuf,
    screenshots_taken: u32,
    pub closed: bool,
}

impl FakeDriver {
    pub fn new(label: &str, page: PageState, screenshot_dir: &Path, log: CallLog) -> Self {
        Self {
            label: label.into(),
            page,
            log,
            failures: HashMap::new(),
            delays: HashMap::new(),
            screenshot_dir: screenshot_dir.to_path_buf(),
            screenshots_taken: 0,
            closed: false,
        }
    }

    /// The next `errors.len()` calls of `command` fail with these errors.
    pub fn fail_next(&mut self, command: &'static str, errors: Vec<DriverError>) {
        self.failures.entry(command).or_default().extend(errors);
    }

    /// Every call of `command` takes `delay` before answering.
    pub fn slow(&mut self, command: &'static str, delay: Duration) {
        self.delays.insert(command, delay);
    }

    fn record(&mut self, call: String) {
        self.log.lock().unwrap().push((self.label.clone(), call));
    }

    fn scripted(&mut self, command: &'static str) -> Result<(), DriverError> {
        if let Some(delay) = self.delays.get(command) {
            sleep(*delay);
        }
        match self.failures.get_mut(command).and_then(|q| q.pop_front()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn element(&self, target: &str) -> ElementStatus {
        self.page.elements.get(target).copied().unwrap_or_default()
    }
}

pub fn not_found(target: &str) -> DriverError {
    DriverError::ElementNotFound {
        target: target.into(),
    }
}

impl BrowserDriver for FakeDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate {}", url));
        self.scripted("navigate")?;
        self.page.url = url.to_string();
        Ok(())
    }

    fn click(&mut self, target_desc: &str) -> Result<(), DriverError> {
        self.record(format!("click {}", target_desc));
        self.scripted("click")?;
        if !self.element(target_desc).exists {
            return Err(not_found(target_desc));
        }
        Ok(())
    }

    fn fill(&mut self, target_desc: &str, value: &str) -> Result<(), DriverError> {
        self.record(format!("fill {} {}", target_desc, value));
        self.scripted("fill")?;
        if !self.element(target_desc).exists {
            return Err(not_found(target_desc));
        }
        self.page.inputs.insert(target_desc.into(), value.into());
        Ok(())
    }

    fn wait(&mut self, condition: &WaitFor) -> Result<(), DriverError> {
        let call = match condition {
            WaitFor::Duration { ms } => format!("wait {}ms", ms),
            WaitFor::PageLoad => "wait page_load".to_string(),
            WaitFor::TextVisible { text } => format!("wait text {}", text),
            WaitFor::ElementVisible { target_desc } => format!("wait element {}", target_desc),
        };
        self.record(call);
        self.scripted("wait")?;
        match condition {
            WaitFor::Duration { ms } => sleep(Duration::from_millis(*ms)),
            WaitFor::PageLoad => {}
            WaitFor::TextVisible { text } => {
                if !self.page.texts.iter().any(|t| t.contains(text.as_str())) {
                    return Err(DriverError::Timeout {
                        command: "wait".into(),
                    });
                }
            }
            WaitFor::ElementVisible { target_desc } => {
                if !self.element(target_desc).visible {
                    return Err(DriverError::Timeout {
                        command: "wait".into(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Behaves like a real page: an unmet condition holds the call for the
    /// whole `timeout` before reporting it.
    fn wait_up_to(&mut self, condition: &WaitFor, timeout: Duration) -> Result<(), DriverError> {
        let result = self.wait(condition);
        if let Err(DriverError::Timeout { .. }) = &result {
            sleep(timeout);
        }
        result
    }

    fn screenshot(&mut self) -> Result<PathBuf, DriverError> {
        self.record("screenshot".to_string());
        self.scripted("screenshot")?;
        self.screenshots_taken += 1;
        std::fs::create_dir_all(&self.screenshot_dir)
            .map_err(|e| DriverError::SessionIo(e.to_string()))?;
        let path = self
            .screenshot_dir
            .join(format!("{}_{:03}.png", self.label, self.screenshots_taken));
        std::fs::write(&path, b"\x89PNG fake").map_err(|e| DriverError::SessionIo(e.to_string()))?;
        Ok(path)
    }

    fn get_url(&mut self) -> Result<String, DriverError> {
        self.record("get_url".to_string());
        self.scripted("get_url")?;
        Ok(self.page.url.clone())
    }

    fn get_title(&mut self) -> Result<String, DriverError> {
        self.record("get_title".to_string());
        self.scripted("get_title")?;
        Ok(self.page.title.clone())
    }

    fn query_text_present(&mut self, text: &str) -> Result<bool, DriverError> {
        self.record(format!("text_present {}", text));
        self.scripted("text_present")?;
        Ok(self.page.texts.iter().any(|t| t.contains(text)))
    }

    fn query_element_state(&mut self, target_desc: &str) -> Result<ElementStatus, DriverError> {
        self.record(format!("element_state {}", target_desc));
        self.scripted("element_state")?;
        Ok(self.element(target_desc))
    }

    fn get_input_value(&mut self, target_desc: &str) -> Result<String, DriverError> {
        self.record(format!("input_value {}", target_desc));
        self.scripted("input_value")?;
        self.page
            .inputs
            .get(target_desc)
            .cloned()
            .ok_or_else(|| not_found(target_desc))
    }

    fn get_checkbox_state(&mut self, target_desc: &str) -> Result<bool, DriverError> {
        self.record(format!("checkbox_state {}", target_desc));
        self.scripted("checkbox_state")?;
        self.page
            .checkboxes
            .get(target_desc)
            .copied()
            .ok_or_else(|| not_found(target_desc))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.record("close".to_string());
        self.closed = true;
        Ok(())
    }
}

// =========================================================================
// Fake factory
// =========================================================================

type Setup = Box<dyn Fn(&mut FakeDriver) + Send + Sync>;

/// Hands out one `FakeDriver` per case, all logging to the same `CallLog`.
pub struct FakeFactory {
    pub page: PageState,
    pub log: CallLog,
    pub screenshot_dir: PathBuf,
    /// Labels for which `open` fails
    pub refuse: Vec<String>,
    setup: Option<Setup>,
    pub opened: Mutex<Vec<String>>,
}

impl FakeFactory {
    pub fn new(page: PageState, screenshot_dir: &Path) -> Self {
        Self {
            page,
            log: new_log(),
            screenshot_dir: screenshot_dir.to_path_buf(),
            refuse: Vec::new(),
            setup: None,
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Run `setup` on every driver right after it is opened.
    pub fn with_setup(mut self, setup: impl Fn(&mut FakeDriver) + Send + Sync + 'static) -> Self {
        self.setup = Some(Box::new(setup));
        self
    }

    pub fn refusing(mut self, label: &str) -> Self {
        self.refuse.push(label.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        calls_of(&self.log)
    }

    pub fn calls_for(&self, label: &str) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, c)| c.clone())
            .collect()
    }
}

impl DriverFactory for FakeFactory {
    fn open(&self, label: &str) -> Result<Box<dyn BrowserDriver + Send>, DriverError> {
        if self.refuse.iter().any(|l| l == label) {
            return Err(DriverError::SessionIo(format!("cannot start browser for {}", label)));
        }
        self.opened.lock().unwrap().push(label.to_string());
        let mut driver = FakeDriver::new(label, self.page.clone(), &self.screenshot_dir, self.log.clone());
        if let Some(setup) = &self.setup {
            setup(&mut driver);
        }
        Ok(Box::new(driver))
    }
}

/// Driver for tests that call the runner or evaluator directly.
pub fn driver(page: PageState, dir: &Path) -> (FakeDriver, CallLog) {
    let log = new_log();
    (FakeDriver::new("case", page, dir, log.clone()), log)
}
