//! Splits `[0, content_length)` into contiguous slices.

use crate::error::{DownloadError, Result};
use crate::state::SliceTask;

/// Plans at most `chunk_count` slices of `ceil(content_length / chunk_count)`
/// bytes each. The last slice is clamped to `content_length`, so it may be
/// shorter; no slice is ever empty.
pub fn plan(content_length: u64, chunk_count: usize) -> Vec<SliceTask> {
    if content_length == 0 || chunk_count == 0 {
        return Vec::new();
    }

    let block_size = content_length.div_ceil(chunk_count as u64);
    let mut tasks = Vec::with_capacity(chunk_count);
    let mut start = 0u64;
    while start < content_length {
        let end = (start + block_size).min(content_length);
        tasks.push(SliceTask::new(start, end));
        start = end;
    }
    tasks
}

/// Checks that `tasks` partition `[0, content_length)` in order and that
/// every progress counter is within its slice.
pub fn validate(content_length: u64, tasks: &[SliceTask]) -> Result<()> {
    if content_length == 0 {
        return Err(DownloadError::InvalidConfig("content length must be positive".into()));
    }

    let mut expected_start = 0u64;
    for (index, task) in tasks.iter().enumerate() {
        if task.start != expected_start {
            return Err(DownloadError::InvalidConfig(format!(
                "slice {} starts at {}, expected {}",
                index, task.start, expected_start
            )));
        }
        if task.end <= task.start {
            return Err(DownloadError::InvalidConfig(format!("slice {} is empty", index)));
        }
        if task.downloaded > task.len() {
            return Err(DownloadError::InvalidConfig(format!(
                "slice {} reports {} bytes for a {} byte range",
                index,
                task.downloaded,
                task.len()
            )));
        }
        expected_start = task.end;
    }

    if expected_start != content_length {
        return Err(DownloadError::InvalidConfig(format!(
            "slices cover {} of {} bytes",
            expected_start, content_length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_four_way_split() {
        let tasks = plan(1_000_000, 4);
        let ranges: Vec<(u64, u64)> = tasks.iter().map(|t| (t.start, t.end)).collect();
        assert_eq!(
            ranges,
            vec![(0, 250_000), (250_000, 500_000), (500_000, 750_000), (750_000, 1_000_000)]
        );
        assert!(tasks.iter().all(|t| t.downloaded == 0));
    }

    #[test]
    fn test_uneven_split_clamps_last_slice() {
        let tasks = plan(10, 3);
        let ranges: Vec<(u64, u64)> = tasks.iter().map(|t| (t.start, t.end)).collect();
        assert_eq!(ranges, vec![(0, 4), (4, 8), (8, 10)]);
    }

    #[test]
    fn test_more_chunks_than_bytes() {
        let tasks = plan(3, 16);
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.len() == 1));
    }

    #[test]
    fn test_single_chunk() {
        assert_eq!(plan(42, 1), vec![SliceTask::new(0, 42)]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(plan(0, 4).is_empty());
        assert!(plan(100, 0).is_empty());
    }

    #[test]
    fn test_validate_rejects_gaps_and_overruns() {
        let gap = [SliceTask::new(0, 4), SliceTask::new(5, 10)];
        assert!(validate(10, &gap).is_err());

        let short = [SliceTask::new(0, 4), SliceTask::new(4, 9)];
        assert!(validate(10, &short).is_err());

        let overrun = [SliceTask { start: 0, end: 10, downloaded: 11 }];
        assert!(validate(10, &overrun).is_err());

        assert!(validate(0, &[]).is_err());
        assert!(validate(10, &plan(10, 3)).is_ok());
    }

    proptest! {
        #[test]
        fn prop_plan_partitions_exactly(content_length in 1u64..5_000_000, chunk_count in 1usize..64) {
            let tasks = plan(content_length, chunk_count);
            prop_assert!(!tasks.is_empty());
            prop_assert!(tasks.len() <= chunk_count);
            prop_assert_eq!(tasks[0].start, 0);
            prop_assert_eq!(tasks[tasks.len() - 1].end, content_length);
            for pair in tasks.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
            let total: u64 = tasks.iter().map(|t| t.len()).sum();
            prop_assert_eq!(total, content_length);
            prop_assert!(validate(content_length, &tasks).is_ok());
        }
    }
}
