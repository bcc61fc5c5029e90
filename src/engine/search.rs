//! Binary search over file bytes to find the first byte offset whose
//! line's timestamp satisfies a bound, without scanning the file linearly.

use crate::engine::locator::LineLocator;
use chrono_tz::Tz;
use std::fs::File;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// First offset whose line has timestamp `>= target`.
    LowerBound,
    /// First offset whose line has timestamp `> target`.
    UpperBound,
}

/// `findOffsetByTime(file, targetInstant, mode) -> offset`.
/// `min_offset` restricts the search to `[min_offset, size)`.
pub fn find_offset_by_time(
    file: &File,
    size: u64,
    tz: Tz,
    target: i64,
    mode: SearchMode,
    min_offset: u64,
) -> io::Result<u64> {
    let locator = LineLocator::new(file, size, tz);
    let mut lo = min_offset.min(size);
    let mut hi = size;
    let mut candidate: Option<u64> = None;

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let located = locator.locate(mid)?;

        let (timestamp, pivot_offset) = match located.timestamp {
            Some(t) => (Some(t), located.line_start),
            None => locator.scan_forward_for_timestamp(located.line_start, hi)?,
        };

        match timestamp {
            None => {
                // No timestamped line between mid and hi: treat the tail as "after".
                hi = mid;
            }
            Some(t) => {
                let satisfies = match mode {
                    SearchMode::LowerBound => t >= target,
                    SearchMode::UpperBound => t > target,
                };
                if satisfies {
                    candidate = Some(pivot_offset);
                    hi = mid;
                } else {
                    lo = (mid + 1).max(pivot_offset);
                }
            }
        }
    }

    Ok(candidate.unwrap_or(size))
}
