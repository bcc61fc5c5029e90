//! Reads and filters the byte slice `[startOffset, endOffset)`, applies a
//! substring filter, and paginate.

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::search::{find_offset_by_time, SearchMode};
use chrono_tz::Tz;
use std::fs::File;
use std::io::Read;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeResult {
    pub lines: Vec<String>,
    pub total: usize,
}

#[allow(clippy::too_many_arguments)]
pub fn read_range(
    file: &File,
    size: u64,
    tz: Tz,
    from: Option<i64>,
    to: Option<i64>,
    limit: usize,
    offset: usize,
    substring: &str,
    soft_cap: u64,
    path_for_errors: &str,
) -> EngineResult<RangeResult> {
    let start_offset = match from {
        Some(t) => find_offset_by_time(file, size, tz, t, SearchMode::LowerBound, 0)
            .map_err(|e| EngineError::io(path_for_errors, e))?,
        None => 0,
    };

    let end_offset = match to {
        Some(t) => find_offset_by_time(
            file,
            size,
            tz,
            t.saturating_add(1),
            SearchMode::LowerBound,
            start_offset,
        )
        .map_err(|e| EngineError::io(path_for_errors, e))?,
        None => size,
    };

    if end_offset <= start_offset {
        return Ok(RangeResult {
            lines: Vec::new(),
            total: 0,
        });
    }

    let span = end_offset - start_offset;
    if span > soft_cap {
        return Err(EngineError::TruncatedByCap {
            size: span,
            cap: soft_cap,
        });
    }

    let slice = read_slice(file, start_offset, span).map_err(|e| EngineError::io(path_for_errors, e))?;

    let mut retained: Vec<String> = slice
        .split(|&b| b == b'\n')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| !segment.iter().all(u8::is_ascii_whitespace))
        .map(|segment| String::from_utf8_lossy(segment).into_owned())
        .filter(|line| substring.is_empty() || line.as_bytes().windows(substring.len().max(1)).any(|w| w == substring.as_bytes()))
        .collect();

    let total = retained.len();
    let lines = if offset >= retained.len() {
        Vec::new()
    } else {
        let end = (offset + limit).min(retained.len());
        retained.drain(offset..end).collect()
    };

    Ok(RangeResult { lines, total })
}

fn read_slice(file: &File, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        let mut buf = vec![0u8; len as usize];
        file.read_exact_at(&mut buf, offset)?;
        Ok(buf)
    }
    #[cfg(not(unix))]
    {
        use std::io::{Seek, SeekFrom};
        let mut f = file.try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(lines: &[&str]) -> (NamedTempFile, File, u64) {
        let mut f = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        f.flush().unwrap();
        let file = File::open(f.path()).unwrap();
        let size = file.metadata().unwrap().len();
        (f, file, size)
    }

    fn ms(s: &str) -> i64 {
        chrono::DateTime::parse_from_rfc3339(s).unwrap().timestamp_millis()
    }

    const SAMPLE: &[&str] = &[
        "11/20/2025, 11:00:00 PM hello",
        "11/20/2025, 11:30:00 PM world",
        "11/21/2025, 12:00:00 AM foo",
        "11/21/2025, 00:30:00", // continuation: no leading timestamp
        "11/21/2025, 01:00:00 AM bar",
    ];

    #[test]
    fn scenario_s1_time_range_slice() {
        let (_f, file, size) = fixture(SAMPLE);
        let from = ms("2025-11-20T23:30:00+00:00");
        let to = ms("2025-11-21T01:00:00+00:00");
        let result = read_range(&file, size, chrono_tz::UTC, Some(from), Some(to), 100, 0, "", u64::MAX, "x").unwrap();
        assert_eq!(
            result.lines,
            vec!["11/20/2025, 11:30:00 PM world", "11/21/2025, 12:00:00 AM foo", "11/21/2025, 00:30:00", "11/21/2025, 01:00:00 AM bar"]
        );
        assert_eq!(result.total, 4);
    }

    #[test]
    fn scenario_s2_substring_filter() {
        let (_f, file, size) = fixture(SAMPLE);
        let from = ms("2025-11-20T23:30:00+00:00");
        let to = ms("2025-11-21T01:00:00+00:00");
        let result =
            read_range(&file, size, chrono_tz::UTC, Some(from), Some(to), 100, 0, "foo", u64::MAX, "x").unwrap();
        assert_eq!(result.lines, vec!["11/21/2025, 12:00:00 AM foo"]);
        assert_eq!(result.total, 1);
    }

    #[test]
    fn pagination_law() {
        let (_f, file, size) = fixture(SAMPLE);
        let whole = read_range(&file, size, chrono_tz::UTC, None, None, 1000, 0, "", u64::MAX, "x").unwrap();

        let o = 1;
        let l = 2;
        let prefix = read_range(&file, size, chrono_tz::UTC, None, None, o, 0, "", u64::MAX, "x").unwrap();
        let rest = read_range(&file, size, chrono_tz::UTC, None, None, l, o, "", u64::MAX, "x").unwrap();
        let combined = read_range(&file, size, chrono_tz::UTC, None, None, l + o, 0, "", u64::MAX, "x").unwrap();

        let mut stitched = prefix.lines.clone();
        stitched.extend(rest.lines.clone());
        assert_eq!(stitched, combined.lines);
        assert_eq!(whole.total, combined.total);
    }

    #[test]
    fn soft_cap_triggers_truncation_error() {
        let (_f, file, size) = fixture(SAMPLE);
        let err = read_range(&file, size, chrono_tz::UTC, None, None, 100, 0, "", 4, "x").unwrap_err();
        assert!(matches!(err, EngineError::TruncatedByCap { .. }));
    }

    #[test]
    fn empty_range_when_end_before_start() {
        let (_f, file, size) = fixture(SAMPLE);
        let from = ms("2025-11-21T01:00:00+00:00");
        let to = ms("2025-11-20T23:00:00+00:00");
        let result = read_range(&file, size, chrono_tz::UTC, Some(from), Some(to), 100, 0, "", u64::MAX, "x").unwrap();
        assert_eq!(result.total, 0);
        assert!(result.lines.is_empty());
    }
}
