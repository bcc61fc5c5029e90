//! The engine facade. Composes the line locator, time-offset search,
//! range reader, line-index reader, time-range cache, and follower behind
//! a small public surface, resolving `service`/`file` pairs against the
//! configured root, enforcing the soft memory cap, and aggregating
//! component errors into a single taxonomy at the facade boundary.

pub mod error;
pub mod follower;
pub mod line_reader;
pub mod locator;
pub mod range_reader;
pub mod search;
pub mod timerange_cache;

use crate::config::EngineConfig;
use crate::services;
use crate::timestamp;
pub use error::{EngineError, EngineResult};
pub use follower::{CancelHandle, CloseReason, LogSink, QueueSink};
pub use range_reader::RangeResult;
pub use timerange_cache::TimeRange;

use chrono_tz::Tz;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const TIMECACHE_SUFFIX: &str = ".timecache";

pub struct Engine {
    root: PathBuf,
    tz: Tz,
    soft_cap: u64,
    followers: Arc<follower::FollowerRegistry>,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            root: config.root.clone(),
            tz: config.timezone,
            soft_cap: config.soft_cap_bytes,
            followers: follower::FollowerRegistry::new(),
        }
    }

    /// Resolves `<root>/<service>/logs/<file>`, validating both path
    /// components against traversal and non-existence.
    fn resolve_log_path(&self, service: &str, file: &str) -> EngineResult<PathBuf> {
        services::validate_name(service)
            .map_err(|e| EngineError::Validation(format!("invalid service: {e}")))?;
        services::validate_name(file)
            .map_err(|e| EngineError::Validation(format!("invalid file: {e}")))?;

        let logs_dir = self.root.join(service).join("logs");
        if !logs_dir.is_dir() {
            return Err(EngineError::Validation(format!(
                "unknown service '{service}'"
            )));
        }

        let path = logs_dir.join(file);
        if !path.is_file() {
            return Err(EngineError::Validation(format!(
                "unknown log file '{file}' for service '{service}'"
            )));
        }
        Ok(path)
    }

    fn open(&self, path: &Path, label: &str) -> EngineResult<(File, u64)> {
        let file = File::open(path).map_err(|e| EngineError::io(label, e))?;
        let size = file
            .metadata()
            .map_err(|e| EngineError::io(label, e))?
            .len();
        Ok((file, size))
    }

    /// `listLogFiles(service) -> [name]`. Filters out
    /// cache sidecars.
    pub fn list_log_files(&self, service: &str) -> EngineResult<Vec<String>> {
        services::validate_name(service)
            .map_err(|e| EngineError::Validation(format!("invalid service: {e}")))?;
        let logs_dir = self.root.join(service).join("logs");
        let relative_dir = format!("{service}/logs");
        if !logs_dir.is_dir() {
            return Err(EngineError::Validation(format!(
                "unknown service '{service}'"
            )));
        }

        let entries = std::fs::read_dir(&logs_dir)
            .map_err(|e| EngineError::io(relative_dir.as_str(), e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::io(relative_dir.as_str(), e))?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(TIMECACHE_SUFFIX) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Normalizes a request-side time string (locale form or ISO-8601 with
    /// offset) to an instant, per spec.md §4.1 — the one point where C1
    /// parses wire input rather than a log line's leading token.
    pub fn parse_time(&self, input: &str) -> EngineResult<i64> {
        timestamp::parse_request_time(input, &self.tz)
            .map_err(|e| EngineError::Validation(e.to_string()))
    }

    /// `readLines(service, file, startLine, numLines) -> [line]`.
    pub fn read_lines(
        &self,
        service: &str,
        file: &str,
        start_line: i64,
        num_lines: usize,
    ) -> EngineResult<Vec<String>> {
        let path = self.resolve_log_path(service, file)?;
        let label = format!("{service}/{file}");
        let (handle, _size) = self.open(&path, &label)?;
        line_reader::read_lines(&handle, start_line, num_lines, &label)
    }

    /// `readTimeRange(service, file, from, to, limit, offset, substring) -> { lines, total }`.
    #[allow(clippy::too_many_arguments)]
    pub fn read_time_range(
        &self,
        service: &str,
        file: &str,
        from: Option<i64>,
        to: Option<i64>,
        limit: usize,
        offset: usize,
        substring: &str,
    ) -> EngineResult<RangeResult> {
        let path = self.resolve_log_path(service, file)?;
        let label = format!("{service}/{file}");
        let (handle, size) = self.open(&path, &label)?;
        range_reader::read_range(
            &handle,
            size,
            self.tz,
            from,
            to,
            limit,
            offset,
            substring,
            self.soft_cap,
            &label,
        )
    }

    /// `getTimeRange(service, file) -> { start, end }`.
    pub fn get_time_range(&self, service: &str, file: &str) -> EngineResult<TimeRange> {
        let path = self.resolve_log_path(service, file)?;
        let label = format!("{service}/{file}");
        timerange_cache::get_time_range(&path, self.tz).map_err(|e| {
            EngineError::io(label.as_str(), std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })
    }

    /// `follow(service, file, filter, sink) -> cancel`.
    pub fn follow(
        &self,
        service: &str,
        file: &str,
        filter: String,
        sink: Arc<dyn LogSink>,
    ) -> EngineResult<CancelHandle> {
        let path = self.resolve_log_path(service, file)?;
        debug!(service, file, "starting follow");
        Ok(self.followers.subscribe(path, filter, sink))
    }

    /// Cancels every live subscriber and tears down all followers. Called
    /// on server shutdown.
    pub fn shutdown(&self) {
        self.followers.shutdown();
    }
}
