//! Terminal sink: status lines and one summary line per finished file.

use std::io::{self, Write};
use std::sync::Mutex;

use zic_core::sink::{progress_line, FinishedTask, ProgressEvent, Severity, Sink, TaskId, TracingSink};

/// Writes to stderr and mirrors everything into the log.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    log: TracingSink,
    out: Mutex<()>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&self, text: &str) {
        let _guard = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(io::stderr().lock(), "{}", text);
    }
}

pub fn status_text(severity: Severity, text: &str) -> String {
    match severity {
        Severity::Info => text.to_string(),
        Severity::Warning => format!("WARNING: {}", text),
        Severity::Error => format!("ERROR: {}", text),
    }
}

impl Sink for ConsoleSink {
    fn begin(&self, task: TaskId, name: &str) {
        self.log.begin(task, name);
    }

    fn progress(&self, event: ProgressEvent) {
        self.log.progress(event);
    }

    fn status(&self, severity: Severity, text: &str) {
        self.log.status(severity, text);
        self.line(&status_text(severity, text));
    }

    fn finish(&self, task: TaskId, done: &FinishedTask) {
        self.log.finish(task, done);
        self.line(&progress_line(done));
    }
}
