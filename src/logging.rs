//! Request/response logging hook.
//!
//! Request logging is off unless enabled on the pool (or via
//! `SDK_LOG_REQUESTS`). A [`LoggingFilter`] sees every finished request,
//! whether or not logging is enabled, and returns `false` to suppress the
//! default log line. Filters cannot affect the result delivered to the caller:
//! a panicking filter is caught and reported.

use crate::client::{ApiClient, RequestSummary};
use crate::transport::RawResponse;
use crate::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Inspects a finished request. Return `true` to let the default log line through.
pub trait LoggingFilter: Send + Sync {
    fn filter(
        &self,
        client: &ApiClient,
        request: &RequestSummary,
        response: Option<&RawResponse>,
        error: Option<&Error>,
    ) -> bool;
}

impl<F> LoggingFilter for F
where
    F: Fn(&ApiClient, &RequestSummary, Option<&RawResponse>, Option<&Error>) -> bool
        + Send
        + Sync,
{
    fn filter(
        &self,
        client: &ApiClient,
        request: &RequestSummary,
        response: Option<&RawResponse>,
        error: Option<&Error>,
    ) -> bool {
        self(client, request, response, error)
    }
}

/// Logging switch plus the optional filter, shared by every client of a pool.
#[derive(Default)]
pub struct LogSettings {
    enabled: AtomicBool,
    filter: RwLock<Option<Arc<dyn LoggingFilter>>>,
}

impl LogSettings {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            filter: RwLock::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn set_filter(&self, filter: Option<Arc<dyn LoggingFilter>>) {
        let mut slot = self.filter.write().unwrap_or_else(|e| e.into_inner());
        *slot = filter;
    }

    pub fn has_filter(&self) -> bool {
        self.filter
            .read()
            .map(|f| f.is_some())
            .unwrap_or(false)
    }

    fn current_filter(&self) -> Option<Arc<dyn LoggingFilter>> {
        self.filter.read().ok().and_then(|f| f.clone())
    }

    /// Run the filter (if any) and emit the default log line when allowed.
    pub(crate) fn observe(
        &self,
        client: &ApiClient,
        request: &RequestSummary,
        response: Option<&RawResponse>,
        error: Option<&Error>,
        elapsed: Duration,
    ) {
        let allowed = match self.current_filter() {
            Some(filter) => {
                match catch_unwind(AssertUnwindSafe(|| {
                    filter.filter(client, request, response, error)
                })) {
                    Ok(allowed) => allowed,
                    Err(_) => {
                        warn!(
                            request_id = %request.id,
                            "logging filter panicked; falling back to default logging"
                        );
                        true
                    }
                }
            }
            None => true,
        };

        if !(allowed && self.is_enabled()) {
            return;
        }

        let status = response.map(|r| r.status);
        match error {
            None => info!(
                request_id = %request.id,
                method = %request.method,
                url = request.url.as_str(),
                http_status = status,
                duration_ms = elapsed.as_millis() as u64,
                response_bytes = response.map(|r| r.body.len()).unwrap_or(0),
                "request completed"
            ),
            Some(err) => info!(
                request_id = %request.id,
                method = %request.method,
                url = request.url.as_str(),
                http_status = status,
                duration_ms = elapsed.as_millis() as u64,
                error = %err,
                "request failed"
            ),
        }
    }
}

/// Install a `fmt` subscriber filtered by `RUST_LOG`, then `SDK_LOG`, then `info`.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("SDK_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
