use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::action_model::WaitFor;
use crate::browser::error::DriverError;

/// Presence and visibility of the element a descriptor resolves to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementStatus {
    pub exists: bool,
    pub visible: bool,
}

/// Browser capability the engine drives. One instance is one page.
///
/// Target descriptors are the author's own words ("ログイン", "Sign in
/// button"); resolving them to elements is the driver's job.
pub trait BrowserDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError>;
    fn click(&mut self, target_desc: &str) -> Result<(), DriverError>;
    fn fill(&mut self, target_desc: &str, value: &str) -> Result<(), DriverError>;
    fn wait(&mut self, condition: &WaitFor) -> Result<(), DriverError>;

    /// Like `wait`, but gives up with `DriverError::Timeout` after `timeout`.
    /// Drivers without a per-call timeout fall back to `wait`.
    fn wait_up_to(&mut self, condition: &WaitFor, timeout: Duration) -> Result<(), DriverError> {
        let _ = timeout;
        self.wait(condition)
    }

    /// Capture the page and return where the image was written.
    fn screenshot(&mut self) -> Result<PathBuf, DriverError>;

    fn get_url(&mut self) -> Result<String, DriverError>;
    fn get_title(&mut self) -> Result<String, DriverError>;
    fn query_text_present(&mut self, text: &str) -> Result<bool, DriverError>;
    fn query_element_state(&mut self, target_desc: &str) -> Result<ElementStatus, DriverError>;
    fn get_input_value(&mut self, target_desc: &str) -> Result<String, DriverError>;
    fn get_checkbox_state(&mut self, target_desc: &str) -> Result<bool, DriverError>;

    /// Release the page. Calling it twice is harmless.
    fn close(&mut self) -> Result<(), DriverError>;
}

/// Opens one independent driver per test case.
pub trait DriverFactory: Sync {
    fn open(&self, label: &str) -> Result<Box<dyn BrowserDriver + Send>, DriverError>;
}
