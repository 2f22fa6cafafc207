use std::sync::atomic::{AtomicU64, Ordering};

use crate::state::SliceTask;

/// Live view of a [`SliceTask`] shared between its fetcher, the writer and
/// progress queries.
///
/// `downloaded` is only advanced by [`SyncWriter::commit`](crate::writer::SyncWriter::commit)
/// while the writer lock is held, after the bytes were written. Readers may
/// load it at any time without the lock.
#[derive(Debug)]
pub struct Slice {
    index: usize,
    start: u64,
    end: u64,
    downloaded: AtomicU64,
}

impl Slice {
    pub fn new(index: usize, task: SliceTask) -> Self {
        Self {
            index,
            start: task.start,
            end: task.end,
            downloaded: AtomicU64::new(task.downloaded),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Acquire)
    }

    pub fn remaining(&self) -> u64 {
        self.len() - self.downloaded()
    }

    pub fn is_complete(&self) -> bool {
        self.downloaded() == self.len()
    }

    /// Absolute file offset of the next byte this slice needs.
    pub fn next_offset(&self) -> u64 {
        self.start + self.downloaded()
    }

    /// Inclusive HTTP range for the bytes still missing.
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.next_offset(), self.end - 1)
    }

    pub(crate) fn advance(&self, len: u64) {
        self.downloaded.fetch_add(len, Ordering::AcqRel);
    }

    pub fn to_task(&self) -> SliceTask {
        SliceTask {
            start: self.start,
            end: self.end,
            downloaded: self.downloaded(),
        }
    }
}
