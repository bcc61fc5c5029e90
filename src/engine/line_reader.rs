//! Reads N lines starting from a signed line index (negative = from end).
//! Deliberately reads the whole file — a future reverse-chunk optimization
//! for large negative starts is a known, undone optimization.

use crate::engine::error::{EngineError, EngineResult};
use std::fs::File;
use std::io::Read;

pub fn read_lines(
    file: &File,
    start_line: i64,
    num_lines: usize,
    path_for_errors: &str,
) -> EngineResult<Vec<String>> {
    if num_lines == 0 {
        return Err(EngineError::Validation("num must be positive".to_string()));
    }

    let mut contents = Vec::new();
    let mut f = file.try_clone().map_err(|e| EngineError::io(path_for_errors, e))?;
    f.read_to_end(&mut contents)
        .map_err(|e| EngineError::io(path_for_errors, e))?;

    let all_lines: Vec<&str> = contents
        .split(|&b| b == b'\n')
        .map(|s| std::str::from_utf8(s).unwrap_or(""))
        .collect();
    // A trailing newline produces one empty trailing segment; drop it so
    // line counts match what a reader would call "lines".
    let all_lines: &[&str] = match all_lines.last() {
        Some(&"") => &all_lines[..all_lines.len() - 1],
        _ => &all_lines[..],
    };

    let total = all_lines.len() as i64;
    let start = if start_line < 0 {
        (total + start_line).max(0)
    } else {
        start_line.min(total)
    };

    let end = (start + num_lines as i64).min(total);
    if start >= end {
        return Ok(Vec::new());
    }

    Ok(all_lines[start as usize..end as usize]
        .iter()
        .map(|s| s.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &[&str] = &[
        "11/20/2025, 11:00:00 PM hello",
        "11/20/2025, 11:30:00 PM world",
        "11/21/2025, 12:00:00 AM foo",
        "11/21/2025, 00:30:00",
        "11/21/2025, 01:00:00 AM bar",
    ];

    fn fixture(lines: &[&str]) -> (NamedTempFile, File) {
        let mut f = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        f.flush().unwrap();
        let file = File::open(f.path()).unwrap();
        (f, file)
    }

    #[test]
    fn scenario_s3_negative_index() {
        let (_f, file) = fixture(SAMPLE);
        let lines = read_lines(&file, -2, 2, "x").unwrap();
        assert_eq!(lines, vec!["11/21/2025, 00:30:00", "11/21/2025, 01:00:00 AM bar"]);
    }

    #[test]
    fn negative_index_law() {
        let (_f, file) = fixture(SAMPLE);
        let n = 3;
        let lines = read_lines(&file, -n, n as usize, "x").unwrap();
        assert_eq!(lines.len(), n as usize);
        assert_eq!(lines, &SAMPLE[SAMPLE.len() - n as usize..]);
    }

    #[test]
    fn positive_index_clamped() {
        let (_f, file) = fixture(SAMPLE);
        let lines = read_lines(&file, 3, 100, "x").unwrap();
        assert_eq!(lines, &SAMPLE[3..]);
    }

    #[test]
    fn zero_num_lines_is_error() {
        let (_f, file) = fixture(SAMPLE);
        assert!(read_lines(&file, 0, 0, "x").is_err());
    }

    #[test]
    fn very_negative_start_clamps_to_zero() {
        let (_f, file) = fixture(SAMPLE);
        let lines = read_lines(&file, -1000, 2, "x").unwrap();
        assert_eq!(lines, &SAMPLE[0..2]);
    }
}
