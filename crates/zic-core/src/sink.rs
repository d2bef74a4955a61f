//! Progress/status sink.
//!
//! The engine never prints. It reports byte progress and severity-tagged
//! status text to a [`Sink`] injected by the front end; implementations
//! serialize concurrent calls internally.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Identifies one transfer within a run.
pub type TaskId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Bytes moved for one task since the last event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub task: TaskId,
    /// Remote size, when known.
    pub total: Option<u64>,
    pub delta: u64,
}

/// Final byte count of a task that ended normally (complete or skipped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedTask {
    pub name: String,
    pub transferred: u64,
    pub total: Option<u64>,
}

pub trait Sink: Send + Sync {
    /// A task started (or restarted) under `name`.
    fn begin(&self, task: TaskId, name: &str);
    fn progress(&self, event: ProgressEvent);
    fn status(&self, severity: Severity, text: &str);
    fn finish(&self, _task: TaskId, _done: &FinishedTask) {}
}

fn to_mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

/// `name  x.xx of y.yy MB [pct%]`; an unknown total is reported as the
/// transferred size.
pub fn progress_line(done: &FinishedTask) -> String {
    let total = done.total.unwrap_or(done.transferred);
    let pct = if total == 0 {
        100.0
    } else {
        done.transferred as f64 * 100.0 / total as f64
    };
    format!(
        "{:<50}  {:05.2} of {:05.2} MB [{:3.0}%]",
        done.name,
        to_mb(done.transferred),
        to_mb(total),
        pct
    )
}

/// Forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn begin(&self, task: TaskId, name: &str) {
        tracing::debug!(task, name, "transfer started");
    }

    fn progress(&self, event: ProgressEvent) {
        tracing::trace!(task = event.task, delta = event.delta, total = ?event.total, "progress");
    }

    fn status(&self, severity: Severity, text: &str) {
        match severity {
            Severity::Info => tracing::info!("{}", text),
            Severity::Warning => tracing::warn!("{}", text),
            Severity::Error => tracing::error!("{}", text),
        }
    }

    fn finish(&self, task: TaskId, done: &FinishedTask) {
        tracing::info!(task, "{}", progress_line(done));
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    lines: VecDeque<(Severity, String)>,
    names: HashMap<TaskId, String>,
    bytes: HashMap<TaskId, u64>,
    totals: HashMap<TaskId, u64>,
    finished: Vec<FinishedTask>,
}

/// Keeps the last `capacity` status lines plus per-task byte counters.
#[derive(Debug)]
pub struct MemorySink {
    capacity: usize,
    state: Mutex<MemoryState>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Buffered status lines, oldest first.
    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.with(|s| s.lines.iter().cloned().collect())
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.with(|s| s.lines.iter().any(|(_, l)| l.contains(needle)))
    }

    /// Sum of progress deltas reported for `task`.
    pub fn bytes_for(&self, task: TaskId) -> u64 {
        self.with(|s| s.bytes.get(&task).copied().unwrap_or(0))
    }

    /// Task ids whose `begin` named them `name`.
    pub fn task_named(&self, name: &str) -> Option<TaskId> {
        self.with(|s| s.names.iter().find(|(_, n)| n.as_str() == name).map(|(id, _)| *id))
    }

    pub fn total_for(&self, task: TaskId) -> Option<u64> {
        self.with(|s| s.totals.get(&task).copied())
    }

    pub fn finished(&self) -> Vec<FinishedTask> {
        self.with(|s| s.finished.clone())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Sink for MemorySink {
    fn begin(&self, task: TaskId, name: &str) {
        self.with(|s| {
            s.names.insert(task, name.to_string());
        });
    }

    fn progress(&self, event: ProgressEvent) {
        self.with(|s| {
            *s.bytes.entry(event.task).or_insert(0) += event.delta;
            if let Some(total) = event.total {
                s.totals.insert(event.task, total);
            }
        });
    }

    fn status(&self, severity: Severity, text: &str) {
        let cap = self.capacity;
        self.with(|s| {
            if s.lines.len() == cap {
                s.lines.pop_front();
            }
            s.lines.push_back((severity, text.to_string()));
        });
    }

    fn finish(&self, _task: TaskId, done: &FinishedTask) {
        self.with(|s| s.finished.push(done.clone()));
    }
}
