use crate::auth::AuthRegistry;
use crate::config::Configuration;
use crate::logging::{LogSettings, LoggingFilter};
use crate::transport::{HttpEngine, ReqwestEngine};
use crate::Result;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

use super::core::ApiClient;

static GLOBAL_POOL: OnceCell<ClientPool> = OnceCell::new();

/// One shared [`ApiClient`] per base URL.
///
/// Clients are created on first use and live as long as the pool. All clients
/// of a pool share the HTTP engine, the request-logging settings and the
/// configured default timeout. Credentials are resolved once, when the pool is
/// built.
pub struct ClientPool {
    clients: RwLock<HashMap<String, Arc<ApiClient>>>,
    engine: Arc<dyn HttpEngine>,
    config: Configuration,
    auth: AuthRegistry,
    log: Arc<LogSettings>,
}

impl ClientPool {
    pub fn new(config: Configuration, engine: Arc<dyn HttpEngine>) -> Self {
        let log = Arc::new(LogSettings::new(config.log_requests));
        // Keyring lookups block; keep them out of `get`.
        let auth = config.auth_registry();
        Self {
            clients: RwLock::new(HashMap::new()),
            engine,
            config,
            auth,
            log,
        }
    }

    /// Pool backed by a [`ReqwestEngine`] built from `config`.
    pub fn from_config(config: Configuration) -> Result<Self> {
        let engine = ReqwestEngine::new(&config)?;
        Ok(Self::new(config, Arc::new(engine)))
    }

    /// Process-wide pool, initialized from the environment on first access.
    pub fn global() -> Result<&'static ClientPool> {
        GLOBAL_POOL.get_or_try_init(|| ClientPool::from_config(Configuration::from_env()))
    }

    /// Shared client for `base_url`. Trailing slashes are ignored.
    pub fn get(&self, base_url: &str) -> Arc<ApiClient> {
        let key = base_url.trim_end_matches('/');

        if let Some(client) = self
            .clients
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
        {
            return Arc::clone(client);
        }

        let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
        let client = clients.entry(key.to_string()).or_insert_with(|| {
            debug!(base_url = key, "creating pooled client");
            Arc::new(ApiClient::from_parts(
                key,
                Arc::clone(&self.engine),
                self.auth.clone(),
                Arc::clone(&self.log),
                Some(self.config.timeout),
            ))
        });
        Arc::clone(client)
    }

    pub fn len(&self) -> usize {
        self.clients.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn set_logging_enabled(&self, enabled: bool) {
        self.log.set_enabled(enabled);
    }

    pub fn logging_enabled(&self) -> bool {
        self.log.is_enabled()
    }

    /// Install (or replace) the logging filter for every client of this pool.
    pub fn set_logging_filter<F: LoggingFilter + 'static>(&self, filter: F) {
        self.log.set_filter(Some(Arc::new(filter)));
    }

    pub fn clear_logging_filter(&self) {
        self.log.set_filter(None);
    }
}

impl fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientPool")
            .field("clients", &self.len())
            .field("logging_enabled", &self.logging_enabled())
            .finish()
    }
}
