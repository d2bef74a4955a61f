use std::path::PathBuf;

use crate::sink::TaskId;

/// What a transfer fetches. Covers skip the small-file guards and keep a fixed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Cover,
    Track { position: u32 },
}

impl FileRole {
    pub fn is_cover(self) -> bool {
        matches!(self, FileRole::Cover)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Sizing,
    Streaming,
    Complete,
    Skipped,
    Failed,
    Cancelled,
}

/// One file to fetch into `dir`.
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub id: TaskId,
    pub role: FileRole,
    /// Direct file URL.
    pub url: String,
    /// Album directory; every file operation is relative to it.
    pub dir: PathBuf,
    /// Destination file name. Fixed for covers; learned from the server for tracks.
    pub name: Option<String>,
    /// Remote size, once a sizing reply advertised one.
    pub expected: Option<u64>,
    /// Bytes present in the destination file for the current attempt.
    pub transferred: u64,
    /// Body bytes read from the network over the task's lifetime.
    pub fetched: u64,
    pub state: TaskState,
}

impl TransferTask {
    pub fn cover(id: TaskId, url: impl Into<String>, dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self::new(id, FileRole::Cover, url.into(), dir.into(), Some(name.into()))
    }

    pub fn track(id: TaskId, position: u32, url: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self::new(id, FileRole::Track { position }, url.into(), dir.into(), None)
    }

    fn new(id: TaskId, role: FileRole, url: String, dir: PathBuf, name: Option<String>) -> Self {
        Self {
            id,
            role,
            url,
            dir,
            name,
            expected: None,
            transferred: 0,
            fetched: 0,
            state: TaskState::Pending,
        }
    }

    /// Name for messages before the real file name is known.
    pub fn display_name(&self) -> String {
        match (&self.name, self.role) {
            (Some(n), _) => n.clone(),
            (None, FileRole::Track { position }) => format!("track {}", position),
            (None, FileRole::Cover) => "cover".to_string(),
        }
    }
}
