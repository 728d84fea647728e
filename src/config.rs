//! Runtime configuration: HTTP engine knobs, request logging and credentials.
//!
//! Every knob has an env override so deployments can tune the runtime
//! without recompiling generated SDKs:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SDK_HTTP_TIMEOUT_SECS` | 60 |
//! | `SDK_HTTP_CONNECT_TIMEOUT_SECS` | 10 |
//! | `SDK_HTTP_POOL_MAX_IDLE_PER_HOST` | 32 |
//! | `SDK_HTTP_POOL_IDLE_TIMEOUT_SECS` | 90 |
//! | `SDK_PROXY_URL` | unset |
//! | `SDK_USER_AGENT` | unset |
//! | `SDK_LOG_REQUESTS` | false |
//! | `SDK_VERIFY_TLS` | true |

use crate::auth::{ApiKeyAuth, ApiKeyLocation, AuthRegistry, BasicAuth, BearerAuth};
use keyring::Entry;
use std::env;
use std::time::Duration;
use tracing::debug;

const KEYRING_SERVICE: &str = "sdk-runtime";

#[derive(Debug, Clone)]
enum AuthSource {
    ApiKey(ApiKeyAuth),
    /// Value looked up from the keyring, then `<SCHEME>_API_KEY`.
    ApiKeyLookup {
        location: ApiKeyLocation,
        key_name: String,
        prefix: Option<String>,
    },
    Basic(BasicAuth),
    Bearer(BearerAuth),
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy_url: Option<String>,
    pub user_agent: Option<String>,
    pub log_requests: bool,
    pub verify_tls: bool,
    auth: Vec<(String, AuthSource)>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            proxy_url: None,
            user_agent: None,
            log_requests: false,
            verify_tls: true,
            auth: Vec::new(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|s| s.trim().parse::<T>().ok())
}

fn parse_flag(value: Option<String>) -> Option<bool> {
    value.map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `SDK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());
        Self {
            timeout: parse_var::<u64>(lookup("SDK_HTTP_TIMEOUT_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            connect_timeout: parse_var::<u64>(lookup("SDK_HTTP_CONNECT_TIMEOUT_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            pool_max_idle_per_host: parse_var(lookup("SDK_HTTP_POOL_MAX_IDLE_PER_HOST"))
                .unwrap_or(defaults.pool_max_idle_per_host),
            pool_idle_timeout: parse_var::<u64>(lookup("SDK_HTTP_POOL_IDLE_TIMEOUT_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.pool_idle_timeout),
            proxy_url: non_empty("SDK_PROXY_URL"),
            user_agent: non_empty("SDK_USER_AGENT"),
            log_requests: parse_flag(lookup("SDK_LOG_REQUESTS")).unwrap_or(defaults.log_requests),
            verify_tls: parse_flag(lookup("SDK_VERIFY_TLS")).unwrap_or(defaults.verify_tls),
            auth: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn with_log_requests(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Register an API key scheme with an explicit value.
    pub fn with_api_key(mut self, scheme: impl Into<String>, auth: ApiKeyAuth) -> Self {
        self.auth.push((scheme.into(), AuthSource::ApiKey(auth)));
        self
    }

    /// Register an API key scheme whose value is resolved when the registry is
    /// built (keyring first, then `<SCHEME>_API_KEY`). Unresolved keys leave the
    /// scheme unregistered.
    pub fn with_api_key_lookup(
        mut self,
        scheme: impl Into<String>,
        location: ApiKeyLocation,
        key_name: impl Into<String>,
        prefix: Option<String>,
    ) -> Self {
        self.auth.push((
            scheme.into(),
            AuthSource::ApiKeyLookup {
                location,
                key_name: key_name.into(),
                prefix,
            },
        ));
        self
    }

    pub fn with_basic_auth(
        mut self,
        scheme: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.auth.push((
            scheme.into(),
            AuthSource::Basic(BasicAuth::new(username, password)),
        ));
        self
    }

    pub fn with_access_token(mut self, scheme: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth
            .push((scheme.into(), AuthSource::Bearer(BearerAuth::new(token))));
        self
    }

    /// Resolve an API key for `scheme`: OS keyring, then `<SCHEME>_API_KEY`.
    pub fn resolve_api_key(scheme: &str) -> Option<String> {
        if let Ok(entry) = Entry::new(KEYRING_SERVICE, scheme) {
            if let Ok(key) = entry.get_password() {
                return Some(key);
            }
        }

        let env_var = format!("{}_API_KEY", scheme.to_uppercase().replace('-', "_"));
        env::var(env_var).ok()
    }

    /// Build the auth registry for clients created from this configuration.
    pub fn auth_registry(&self) -> AuthRegistry {
        let mut registry = AuthRegistry::new();
        for (scheme, source) in &self.auth {
            match source {
                AuthSource::ApiKey(auth) => registry.register(scheme.clone(), auth.clone()),
                AuthSource::ApiKeyLookup {
                    location,
                    key_name,
                    prefix,
                } => match Self::resolve_api_key(scheme) {
                    Some(value) => registry.register(
                        scheme.clone(),
                        ApiKeyAuth {
                            location: *location,
                            key_name: key_name.clone(),
                            value,
                            prefix: prefix.clone(),
                        },
                    ),
                    None => debug!(auth_scheme = scheme.as_str(), "no api key found"),
                },
                AuthSource::Basic(auth) => registry.register(scheme.clone(), auth.clone()),
                AuthSource::Bearer(auth) => registry.register(scheme.clone(), auth.clone()),
            }
        }
        registry
    }
}
