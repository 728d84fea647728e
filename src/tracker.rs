//! Registry of in-flight requests.
//!
//! Each dispatched request is registered before its task starts and removed
//! exactly once: by the task when it terminates, or by [`RequestTracker::cancel`].
//! Whichever removal comes first wins; the other observes `None`.

use reqwest::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Opaque identifier of a dispatched request. Unique per tracker; the numeric
/// value carries no ordering meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Rebuild an id from its numeric form, e.g. one that crossed an FFI or IPC boundary.
    pub fn from_u64(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

struct TaskInner {
    method: Method,
    url: String,
    started_at: Instant,
    token: CancellationToken,
}

/// Handle on an in-flight request task, for cancellation and introspection.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<TaskInner>,
}

impl TaskHandle {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                method,
                url: url.into(),
                started_at: Instant::now(),
                token: CancellationToken::new(),
            }),
        }
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Token the request task waits on.
    pub(crate) fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    pub(crate) fn cancel(&self) {
        self.inner.token.cancel();
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("method", &self.inner.method)
            .field("url", &self.inner.url)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[derive(Default)]
pub struct RequestTracker {
    next_id: AtomicU64,
    inflight: Mutex<HashMap<RequestId, TaskHandle>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<RequestId, TaskHandle>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `task` under a fresh id.
    pub fn register(&self, task: TaskHandle) -> RequestId {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.entries().insert(id, task);
        id
    }

    /// Signal cancellation and drop the entry. Returns `false` when `id` is
    /// unknown or already terminated.
    pub fn cancel(&self, id: RequestId) -> bool {
        let task = self.entries().remove(&id);
        match task {
            Some(task) => {
                task.cancel();
                true
            }
            None => false,
        }
    }

    pub fn resolve(&self, id: RequestId) -> Option<TaskHandle> {
        self.entries().get(&id).cloned()
    }

    /// Remove `id` without cancelling it. Returns the entry if this call removed it.
    pub fn remove(&self, id: RequestId) -> Option<TaskHandle> {
        self.entries().remove(&id)
    }

    pub fn size(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl fmt::Debug for RequestTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTracker")
            .field("inflight", &self.size())
            .finish()
    }
}
