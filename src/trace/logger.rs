use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing::warn;

use crate::trace::trace::TraceEvent;

/// JSONL sink for executed steps, shared by every worker of a run.
///
/// Each event is one line, flushed as soon as it is written so a killed run
/// still leaves a readable trace.
pub struct TraceLogger {
    sink: Option<Mutex<BufWriter<File>>>,
}

impl TraceLogger {
    /// Open `path` for appending. An unopenable file disables the logger.
    pub fn new(path: &Path) -> Self {
        let sink = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map(|f| Mutex::new(BufWriter::new(f)))
            .map_err(|e| warn!(path = %path.display(), error = %e, "could not open trace file; tracing disabled"))
            .ok();
        Self { sink }
    }

    /// A logger that drops every event.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Append one event. Failures are logged and never reach the run.
    pub fn log(&self, event: &TraceEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(e) = Self::append(sink, event) {
            warn!(case = %event.case, step = event.step, error = %e, "trace event dropped");
        }
    }

    fn append(sink: &Mutex<BufWriter<File>>, event: &TraceEvent) -> std::io::Result<()> {
        let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
        let mut out = sink
            .lock()
            .map_err(|_| std::io::Error::other("trace sink lock poisoned"))?;
        writeln!(out, "{}", line)?;
        out.flush()
    }
}
