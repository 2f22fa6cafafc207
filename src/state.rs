use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, end)` of the resource and how much of it
/// has been written to disk.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceTask {
    pub start: u64,
    pub end: u64,
    pub downloaded: u64,
}

impl SliceTask {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end, downloaded: 0 }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complete(&self) -> bool {
        self.downloaded == self.len()
    }
}

/// Everything needed to rebuild a session with its progress.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub url: String,
    pub content_length: u64,
    pub target_path: String,
    pub block_count: usize,
    pub buffer_size: usize,
    pub durable: bool,
    pub tasks: Vec<SliceTask>,
}

impl SessionSnapshot {
    pub fn downloaded(&self) -> u64 {
        self.tasks.iter().map(|t| t.downloaded).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No job has been started yet.
    Idle,
    Running,
    Completed,
    Cancelled,
    /// The last job aborted on an error; `start` may be called again.
    Failed,
}

impl Display for RunState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "Idle"),
            RunState::Running => write!(f, "Running"),
            RunState::Completed => write!(f, "Completed"),
            RunState::Cancelled => write!(f, "Cancelled"),
            RunState::Failed => write!(f, "Failed"),
        }
    }
}
