//! Given a byte offset into a log file, locates the start of the next
//! line and, if present, that line's timestamp — without reading the whole
//! file.

use crate::timestamp::parse_leading_timestamp;
use chrono_tz::Tz;
use std::fs::File;
use std::io;

/// Bytes read forward from `p` while hunting for the next newline.
const SEEK_WINDOW: usize = 256;
/// Bytes read at a discovered line start while extracting its timestamp
/// token. Sized so a typical `M/D/YYYY, H:MM:SS AM|PM` header always fits.
const HEADER_WINDOW: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub line_start: u64,
    pub timestamp: Option<i64>,
}

pub struct LineLocator<'a> {
    file: &'a File,
    size: u64,
    tz: Tz,
}

impl<'a> LineLocator<'a> {
    pub fn new(file: &'a File, size: u64, tz: Tz) -> Self {
        Self { file, size, tz }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// `locate(p) -> { lineStart, timestamp|none }`.
    pub fn locate(&self, p: u64) -> io::Result<Located> {
        let line_start = self.find_line_start(p)?;
        let timestamp = self.read_timestamp_at(line_start)?;
        Ok(Located {
            line_start,
            timestamp,
        })
    }

    /// Smallest offset `q >= p` such that `q == 0` or byte at `q-1` is `\n`.
    fn find_line_start(&self, p: u64) -> io::Result<u64> {
        if p == 0 || p >= self.size {
            return Ok(p.min(self.size));
        }

        // p itself may already be a line start; check the preceding byte
        // with a tiny backward peek before scanning forward.
        let prev = read_window(self.file, p - 1, 1)?;
        if prev.first() == Some(&b'\n') {
            return Ok(p);
        }

        let mut cursor = p;
        loop {
            let remaining = self.size.saturating_sub(cursor);
            if remaining == 0 {
                return Ok(self.size);
            }
            let window = read_window(self.file, cursor, SEEK_WINDOW.min(remaining as usize))?;
            if let Some(nl) = window.iter().position(|&b| b == b'\n') {
                let found = cursor + nl as u64 + 1;
                return Ok(found.min(self.size));
            }
            if (window.len() as u64) < remaining.min(SEEK_WINDOW as u64) {
                // read returned less than requested and didn't find \n: EOF
                return Ok(self.size);
            }
            cursor += window.len() as u64;
        }
    }

    fn read_timestamp_at(&self, line_start: u64) -> io::Result<Option<i64>> {
        if line_start >= self.size {
            return Ok(None);
        }
        let remaining = (self.size - line_start) as usize;
        let window = read_window(self.file, line_start, HEADER_WINDOW.min(remaining))?;
        let text = String::from_utf8_lossy(&window);
        Ok(parse_leading_timestamp(&text, &self.tz))
    }

    /// Scans line-by-line from `from` up to `ceiling`, looking for the
    /// first timestamped line. Bounded: never scans past `ceiling`. Used to
    /// recover when a binary-search pivot lands on a continuation line.
    pub fn scan_forward_for_timestamp(
        &self,
        from: u64,
        ceiling: u64,
    ) -> io::Result<(Option<i64>, u64)> {
        let mut at = self.find_line_start(from)?;
        while at < ceiling && at < self.size {
            let located = self.locate(at)?;
            if located.timestamp.is_some() {
                return Ok((located.timestamp, located.line_start));
            }
            let next = self.find_line_start(located.line_start + 1)?;
            if next <= at {
                break;
            }
            at = next;
        }
        Ok((None, at))
    }
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

/// Reads up to `len` bytes starting at `offset`, looping over short reads;
/// returns fewer than `len` bytes only at EOF.
pub(crate) fn read_window(file: &File, offset: u64, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = read_at(file, &mut buf[filled..], offset + filled as u64)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}
