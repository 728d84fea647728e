use crate::auth::{AuthRegistry, AuthScheme};
use crate::codec::{BodyEncoder, EncoderRegistry};
use crate::logging::LogSettings;
use crate::params::Headers;
use crate::tracker::{RequestId, RequestTracker, TaskHandle};
use crate::transport::HttpEngine;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// API client bound to one base URL.
///
/// Shared across threads behind an `Arc`. Default headers, auth schemes and
/// encoders are swapped atomically; each request works on a snapshot taken
/// at dispatch time, so concurrent writers never affect a request that is
/// already being built.
pub struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) default_headers: ArcSwap<Headers>,
    pub(crate) auth: ArcSwap<AuthRegistry>,
    pub(crate) encoders: ArcSwap<EncoderRegistry>,
    pub(crate) engine: Arc<dyn HttpEngine>,
    pub(crate) tracker: Arc<RequestTracker>,
    pub(crate) log: Arc<LogSettings>,
    pub(crate) default_timeout: Option<Duration>,
}

impl ApiClient {
    /// Standalone client with its own (disabled) logging settings. Prefer
    /// [`ClientPool::get`](crate::ClientPool::get) to share one client per base URL.
    pub fn new(base_url: &str, engine: Arc<dyn HttpEngine>) -> Self {
        Self::from_parts(
            base_url,
            engine,
            AuthRegistry::new(),
            Arc::new(LogSettings::default()),
            None,
        )
    }

    pub(crate) fn from_parts(
        base_url: &str,
        engine: Arc<dyn HttpEngine>,
        auth: AuthRegistry,
        log: Arc<LogSettings>,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: ArcSwap::from_pointee(Headers::new()),
            auth: ArcSwap::from_pointee(auth),
            encoders: ArcSwap::from_pointee(EncoderRegistry::new()),
            engine,
            tracker: Arc::new(RequestTracker::new()),
            log,
            default_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set a header sent with every request unless the request overrides it.
    pub fn set_default_header(&self, name: &str, value: &str) {
        self.default_headers.rcu(|current| {
            let mut next = Headers::clone(current);
            next.insert(name, value);
            next
        });
    }

    pub fn remove_default_header(&self, name: &str) {
        self.default_headers.rcu(|current| {
            let mut next = Headers::clone(current);
            next.remove(name);
            next
        });
    }

    /// Snapshot of the current default headers.
    pub fn default_headers(&self) -> Arc<Headers> {
        self.default_headers.load_full()
    }

    /// Replace the whole auth registry.
    pub fn set_auth_registry(&self, registry: AuthRegistry) {
        self.auth.store(Arc::new(registry));
    }

    pub fn register_auth<A: AuthScheme + 'static>(&self, name: &str, scheme: A) {
        let scheme: Arc<dyn AuthScheme> = Arc::new(scheme);
        self.auth.rcu(|current| {
            let mut next = AuthRegistry::clone(current);
            next.register_arc(name, scheme.clone());
            next
        });
    }

    pub fn auth_registry(&self) -> Arc<AuthRegistry> {
        self.auth.load_full()
    }

    /// Plug in a body encoder for `media_type`.
    pub fn register_encoder(&self, media_type: &str, encoder: Arc<dyn BodyEncoder>) {
        self.encoders.rcu(|current| {
            let mut next = EncoderRegistry::clone(current);
            next.register(media_type, encoder.clone());
            next
        });
    }

    pub fn log_settings(&self) -> &Arc<LogSettings> {
        &self.log
    }

    /// Best-effort cancellation. Unknown or finished ids are ignored.
    pub fn cancel(&self, id: RequestId) -> bool {
        let cancelled = self.tracker.cancel(id);
        debug!(request_id = %id, cancelled, "cancel requested");
        cancelled
    }

    /// The in-flight task behind `id`, if it has not terminated yet.
    pub fn task(&self, id: RequestId) -> Option<TaskHandle> {
        self.tracker.resolve(id)
    }

    /// Number of requests currently in flight on this client.
    pub fn request_queue_size(&self) -> usize {
        self.tracker.size()
    }

    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("inflight", &self.tracker.size())
            .finish()
    }
}
