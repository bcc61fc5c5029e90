//! Watches an active log file and fans newly-appended lines out to
//! subscribers, surviving rotation. Rotation is detected via inode tracking
//! and a truncate check, and delivery is driven by filesystem notifications
//! (`notify`) rather than periodic polling.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify as AsyncNotify;
use tracing::{debug, warn};
use uuid::Uuid;

const DEFAULT_QUEUE_CAPACITY: usize = 1024;
const WATCHER_RETRY_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Cancelled,
    ServerShutdown,
}

/// A capability over `{onLine(line), onClose(reason)}`.
/// Implementations must be non-blocking: the follower calls these
/// synchronously from its delivery loop.
pub trait LogSink: Send + Sync {
    fn on_line(&self, line: &str);
    fn on_close(&self, reason: CloseReason);
}

/// A bounded outbound queue a subscriber owns. Overflow drops the oldest
/// queued line and increments a counter exposed to the caller, per
/// the drop-oldest backpressure rule. Consumers `recv().await` to drain it —
/// an explicit ring buffer is used since a `tokio::mpsc` cannot evict its
/// oldest queued item on overflow.
pub struct QueueSink {
    queue: Mutex<std::collections::VecDeque<String>>,
    notify: AsyncNotify,
    overflow: AtomicU64,
    capacity: usize,
    closed: AtomicBool,
}

impl QueueSink {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(std::collections::VecDeque::with_capacity(capacity.min(64))),
            notify: AsyncNotify::new(),
            overflow: AtomicU64::new(0),
            capacity,
            closed: AtomicBool::new(false),
        })
    }

    pub fn with_default_capacity() -> Arc<Self> {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    /// Waits for and removes the next queued line, or `None` once closed
    /// and drained.
    pub async fn recv(&self) -> Option<String> {
        loop {
            if let Some(line) = self.queue.lock().unwrap().pop_front() {
                return Some(line);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            self.notify.notified().await;
        }
    }
}

impl LogSink for QueueSink {
    fn on_line(&self, line: &str) {
        let mut q = self.queue.lock().unwrap();
        if q.len() >= self.capacity {
            q.pop_front();
            self.overflow.fetch_add(1, Ordering::Relaxed);
        }
        q.push_back(line.to_string());
        drop(q);
        self.notify.notify_waiters();
    }

    fn on_close(&self, _reason: CloseReason) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }
}

struct SubscriberEntry {
    filter: String,
    sink: Arc<dyn LogSink>,
}

struct FollowerState {
    offset: u64,
    inode: Option<u64>,
    partial: Vec<u8>,
}

pub struct Follower {
    path: PathBuf,
    state: Mutex<FollowerState>,
    subscribers: Mutex<HashMap<Uuid, SubscriberEntry>>,
    _watcher: Mutex<Option<RecommendedWatcher>>,
}

impl Follower {
    fn spawn(path: PathBuf) -> Arc<Self> {
        let initial_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let initial_inode = std::fs::metadata(&path).ok().map(|m| file_identity(&m));

        let follower = Arc::new(Follower {
            path: path.clone(),
            state: Mutex::new(FollowerState {
                offset: initial_size,
                inode: initial_inode,
                partial: Vec::new(),
            }),
            subscribers: Mutex::new(HashMap::new()),
            _watcher: Mutex::new(None),
        });

        let watched_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let (tx, mut rx) = tokio::sync::mpsc::channel::<notify::Result<Event>>(256);

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        });

        match watcher {
            Ok(mut watcher) => {
                if let Err(e) = watcher.watch(&watched_dir, RecursiveMode::NonRecursive) {
                    warn!(path = %path.display(), error = %e, "failed to watch log directory");
                }
                *follower._watcher.lock().unwrap() = Some(watcher);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to create file watcher");
            }
        }

        let weak = Arc::downgrade(&follower);
        tokio::spawn(async move {
            let mut retries = 0u32;
            while let Some(res) = rx.recv().await {
                let Some(follower) = weak.upgrade() else {
                    break;
                };
                match res {
                    Ok(event) => {
                        if event.paths.iter().any(|p| p == &follower.path) {
                            follower.poll_and_deliver();
                        }
                    }
                    Err(e) => {
                        retries += 1;
                        warn!(error = %e, retries, "file watcher error");
                        if retries > WATCHER_RETRY_LIMIT {
                            warn!("file watcher exceeded retry limit, giving up");
                            break;
                        }
                    }
                }
            }
            debug!(path = %follower_path_for_log(&weak), "follower watch task ended");
        });

        follower
    }

    fn poll_and_deliver(&self) {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(m) => m,
            Err(_) => return, // transient: file briefly missing during rotation
        };
        let current_inode = file_identity(&metadata);
        let current_size = metadata.len();

        let mut state = self.state.lock().unwrap();

        let rotated = state.inode.is_some_and(|i| i != current_inode);
        let truncated = current_size < state.offset;
        if rotated || truncated {
            state.offset = 0;
            state.partial.clear();
        }
        state.inode = Some(current_inode);

        if current_size <= state.offset {
            return;
        }

        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return,
        };
        let to_read = (current_size - state.offset) as usize;
        let bytes = match crate::engine::locator::read_window(&file, state.offset, to_read) {
            Ok(b) => b,
            Err(_) => return,
        };
        state.offset += bytes.len() as u64;

        let mut combined = std::mem::take(&mut state.partial);
        combined.extend_from_slice(&bytes);

        let mut lines: Vec<String> = Vec::new();
        let mut start = 0;
        for (i, &b) in combined.iter().enumerate() {
            if b == b'\n' {
                lines.push(String::from_utf8_lossy(&combined[start..i]).into_owned());
                start = i + 1;
            }
        }
        state.partial = combined[start..].to_vec();
        drop(state);

        if lines.is_empty() {
            return;
        }

        let subs = self.subscribers.lock().unwrap();
        for entry in subs.values() {
            for line in &lines {
                if entry.filter.is_empty() || line.contains(&entry.filter) {
                    entry.sink.on_line(line);
                }
            }
        }
    }
}

fn follower_path_for_log(weak: &std::sync::Weak<Follower>) -> String {
    weak.upgrade()
        .map(|f| f.path.display().to_string())
        .unwrap_or_default()
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

/// Process-wide map from canonical file path to its follower. Mutation is
/// serialized under a single mutex.
#[derive(Default)]
pub struct FollowerRegistry {
    followers: Mutex<HashMap<PathBuf, Arc<Follower>>>,
}

impl FollowerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `subscribe(file, filter, sink) -> cancel`.
    pub fn subscribe(
        self: &Arc<Self>,
        path: PathBuf,
        filter: String,
        sink: Arc<dyn LogSink>,
    ) -> CancelHandle {
        let mut followers = self.followers.lock().unwrap();
        let follower = followers
            .entry(path.clone())
            .or_insert_with(|| Follower::spawn(path.clone()))
            .clone();
        drop(followers);

        let id = Uuid::new_v4();
        follower
            .subscribers
            .lock()
            .unwrap()
            .insert(id, SubscriberEntry { filter, sink });

        CancelHandle {
            registry: self.clone(),
            path,
            id,
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancels every subscriber and drops every follower. Used on engine
    /// teardown.
    pub fn shutdown(&self) {
        let mut followers = self.followers.lock().unwrap();
        for follower in followers.values() {
            let mut subs = follower.subscribers.lock().unwrap();
            for entry in subs.values() {
                entry.sink.on_close(CloseReason::ServerShutdown);
            }
            subs.clear();
        }
        followers.clear();
    }

    pub fn active_follower_count(&self) -> usize {
        self.followers.lock().unwrap().len()
    }
}

/// Opaque cancel capability. `cancel` is idempotent and
/// synchronous: no further callbacks are delivered once it returns.
#[derive(Clone)]
pub struct CancelHandle {
    registry: Arc<FollowerRegistry>,
    path: PathBuf,
    id: Uuid,
    done: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut followers = self.registry.followers.lock().unwrap();
        let Some(follower) = followers.get(&self.path).cloned() else {
            return;
        };
        let mut subs = follower.subscribers.lock().unwrap();
        if let Some(entry) = subs.remove(&self.id) {
            entry.sink.on_close(CloseReason::Cancelled);
        }
        let empty = subs.is_empty();
        drop(subs);
        if empty {
            followers.remove(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn drain_until(sink: &QueueSink, n: usize, timeout: Duration) -> Vec<String> {
        let mut out = Vec::new();
        let deadline = tokio::time::Instant::now() + timeout;
        while out.len() < n {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, sink.recv()).await {
                Ok(Some(line)) => out.push(line),
                _ => break,
            }
        }
        out
    }

    #[tokio::test]
    async fn scenario_s5_live_follow_with_filter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        File::create(&path).unwrap();

        let registry = FollowerRegistry::new();
        let sink = QueueSink::with_default_capacity();
        let _cancel = registry.subscribe(path.clone(), "err".to_string(), sink.clone());

        // give the watcher a moment to register
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        for line in ["info:1", "err:2", "warn:3", "err:4"] {
            writeln!(f, "{}", line).unwrap();
        }
        drop(f);

        let lines = drain_until(&sink, 2, Duration::from_secs(5)).await;
        assert_eq!(lines, vec!["err:2", "err:4"]);
    }

    #[tokio::test]
    async fn scenario_s8_resumes_from_head_after_truncate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "11/20/2025, 11:00:00 PM before-rotation\n").unwrap();

        let registry = FollowerRegistry::new();
        let sink = QueueSink::with_default_capacity();
        let cancel = registry.subscribe(path.clone(), String::new(), sink.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Truncate to zero in place (same inode, size drops below the
        // follower's last-known offset), then append a fresh line.
        File::create(&path).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "11/21/2025, 12:00:00 AM after-rotation").unwrap();
        drop(f);

        let lines = drain_until(&sink, 1, Duration::from_secs(5)).await;
        assert_eq!(lines, vec!["11/21/2025, 12:00:00 AM after-rotation".to_string()]);

        // The subscriber must still be live: the follower was reset, not
        // cancelled, so it still shows up in the registry.
        assert_eq!(registry.active_follower_count(), 1);
        cancel.cancel();
    }

    #[tokio::test]
    async fn scenario_s8_resumes_from_head_after_rename_and_recreate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "11/20/2025, 11:00:00 PM before-rotation\n").unwrap();

        let registry = FollowerRegistry::new();
        let sink = QueueSink::with_default_capacity();
        let cancel = registry.subscribe(path.clone(), String::new(), sink.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Rename the old file out of the way and recreate at the same path:
        // a new inode, distinct from the one the follower last observed.
        let rotated_path = dir.path().join("app.log.1");
        std::fs::rename(&path, &rotated_path).unwrap();
        std::fs::write(&path, "11/21/2025, 12:00:00 AM fresh-head\n").unwrap();

        let lines = drain_until(&sink, 1, Duration::from_secs(5)).await;
        assert_eq!(lines, vec!["11/21/2025, 12:00:00 AM fresh-head".to_string()]);

        assert_eq!(registry.active_follower_count(), 1);
        cancel.cancel();
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_stops_delivery() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        File::create(&path).unwrap();

        let registry = FollowerRegistry::new();
        let sink = QueueSink::with_default_capacity();
        let cancel = registry.subscribe(path.clone(), String::new(), sink.clone());

        cancel.cancel();
        cancel.cancel(); // idempotent, must not panic

        assert_eq!(registry.active_follower_count(), 0);
    }

    #[tokio::test]
    async fn overflow_counter_increments_on_slow_consumer() {
        let sink = QueueSink::new(2);
        sink.on_line("a");
        sink.on_line("b");
        sink.on_line("c"); // evicts "a"
        assert_eq!(sink.overflow_count(), 1);
        assert_eq!(sink.recv().await, Some("b".to_string()));
        assert_eq!(sink.recv().await, Some("c".to_string()));
    }
}
