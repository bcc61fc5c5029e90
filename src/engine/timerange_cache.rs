//! Time-range metadata for a log file, persisted next to it in a
//! rotation-aware sidecar, written via the same write-to-temp-then-rename
//! idiom used elsewhere in this crate.

use crate::engine::locator::read_window;
use crate::timestamp::parse_leading_timestamp;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const HEADER_SIG_BYTES: usize = 64;
const START_SCAN_BYTES: u64 = 50 * 1024;
const END_CHUNK_BYTES: u64 = 10 * 1024;
const END_SCAN_MAX_BYTES: u64 = 100 * 1024;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SidecarEntry {
    start: Option<i64>,
    end: Option<i64>,
    size: u64,
    inode: u64,
    #[serde(rename = "headerSig")]
    header_sig: String,
}

/// `getTimeRange(file) -> { start, end }`.
pub fn get_time_range(log_path: &Path, tz: Tz) -> Result<TimeRange, CacheError> {
    let sidecar_path = sidecar_path_for(log_path);
    let file = File::open(log_path)?;
    let metadata = file.metadata()?;
    let size = metadata.len();
    let inode = file_identity(&metadata);
    let header_sig = header_signature(&file, size)?;
    let is_active = is_active_file(log_path);

    let cached = load_sidecar(&sidecar_path);

    match cached {
        None => {
            let range = recompute(&file, size, tz)?;
            persist(&sidecar_path, &range, size, inode, &header_sig)?;
            Ok(range)
        }
        Some(entry) => {
            if !is_active && entry.start.is_some() && entry.end.is_some() {
                return Ok(TimeRange {
                    start: entry.start,
                    end: entry.end,
                });
            }

            let identity_changed = entry.inode != inode;
            let truncated = size < entry.size;
            let rewritten = entry.header_sig != header_sig;

            if identity_changed || truncated || rewritten {
                let range = recompute(&file, size, tz)?;
                persist(&sidecar_path, &range, size, inode, &header_sig)?;
                return Ok(range);
            }

            if size > entry.size {
                let end = recompute_end(&file, size, tz)?;
                let range = TimeRange {
                    start: entry.start,
                    end,
                };
                persist(&sidecar_path, &range, size, inode, &header_sig)?;
                return Ok(range);
            }

            Ok(TimeRange {
                start: entry.start,
                end: entry.end,
            })
        }
    }
}

fn recompute(file: &File, size: u64, tz: Tz) -> Result<TimeRange, CacheError> {
    let start = recompute_start(file, size, tz)?;
    let end = recompute_end(file, size, tz)?;
    Ok(TimeRange { start, end })
}

fn recompute_start(file: &File, size: u64, tz: Tz) -> Result<Option<i64>, CacheError> {
    let scan_len = START_SCAN_BYTES.min(size) as usize;
    let window = read_window(file, 0, scan_len)?;
    let text = String::from_utf8_lossy(&window);
    for line in text.split('\n') {
        if let Some(ts) = parse_leading_timestamp(line, &tz) {
            return Ok(Some(ts));
        }
    }
    Ok(None)
}

fn recompute_end(file: &File, size: u64, tz: Tz) -> Result<Option<i64>, CacheError> {
    let mut scanned = 0u64;
    let mut last_found = None;

    while scanned < END_SCAN_MAX_BYTES && scanned < size {
        let chunk_len = END_CHUNK_BYTES.min(size - scanned).min(END_SCAN_MAX_BYTES - scanned);
        let start_offset = size - scanned - chunk_len;
        let window = read_window(file, start_offset, chunk_len as usize)?;
        let text = String::from_utf8_lossy(&window);
        for line in text.split('\n') {
            if let Some(ts) = parse_leading_timestamp(line, &tz) {
                last_found = Some(ts);
            }
        }
        scanned += chunk_len;
        if last_found.is_some() {
            return Ok(last_found);
        }
        if start_offset == 0 {
            break;
        }
    }

    Ok(last_found)
}

fn header_signature(file: &File, size: u64) -> io::Result<String> {
    let len = HEADER_SIG_BYTES.min(size as usize);
    let window = read_window(file, 0, len)?;
    Ok(hex::encode(window))
}

fn is_active_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "log")
}

fn sidecar_path_for(log_path: &Path) -> PathBuf {
    let mut name = log_path.file_name().unwrap_or_default().to_os_string();
    name.push(".timecache");
    log_path.with_file_name(name)
}

fn load_sidecar(path: &Path) -> Option<SidecarEntry> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn persist(
    path: &Path,
    range: &TimeRange,
    size: u64,
    inode: u64,
    header_sig: &str,
) -> Result<(), CacheError> {
    let entry = SidecarEntry {
        start: range.start,
        end: range.end,
        size,
        inode,
        header_sig: header_sig.to_string(),
    };
    let json = serde_json::to_string_pretty(&entry)?;
    let tmp_path = path.with_extension("timecache.tmp");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn file_identity(metadata: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn file_identity(metadata: &std::fs::Metadata) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    metadata.len().hash(&mut hasher);
    if let Ok(modified) = metadata.modified() {
        modified.hash(&mut hasher);
    }
    hasher.finish()
}
