//! Named authentication schemes applied to outgoing requests.
//!
//! Generated operations list the scheme names they require; the executor looks
//! each name up in an [`AuthRegistry`] and lets the scheme add or overwrite
//! header and query parameters. Schemes run in list order, so a later scheme
//! overwrites values written by an earlier one. Names with no registered
//! scheme are skipped.

use crate::params::{Headers, QueryParams};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A credential transform over the accumulating header and query maps.
pub trait AuthScheme: Send + Sync {
    fn apply(&self, headers: &mut Headers, query: &mut QueryParams);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
}

/// API key sent in a header or query parameter, optionally prefixed
/// (`Authorization: Token abc`).
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    pub location: ApiKeyLocation,
    pub key_name: String,
    pub value: String,
    pub prefix: Option<String>,
}

impl ApiKeyAuth {
    pub fn header(key_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            location: ApiKeyLocation::Header,
            key_name: key_name.into(),
            value: value.into(),
            prefix: None,
        }
    }

    pub fn query(key_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            location: ApiKeyLocation::Query,
            key_name: key_name.into(),
            value: value.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn rendered(&self) -> String {
        match self.prefix.as_deref() {
            Some(p) if !p.is_empty() => format!("{} {}", p, self.value),
            _ => self.value.clone(),
        }
    }
}

impl AuthScheme for ApiKeyAuth {
    fn apply(&self, headers: &mut Headers, query: &mut QueryParams) {
        match self.location {
            ApiKeyLocation::Header => {
                headers.insert(&self.key_name, self.rendered());
            }
            ApiKeyLocation::Query => query.insert(self.key_name.clone(), self.rendered()),
        }
    }
}

/// HTTP basic authentication.
#[derive(Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl AuthScheme for BasicAuth {
    fn apply(&self, headers: &mut Headers, _query: &mut QueryParams) {
        let credentials = STANDARD.encode(format!("{}:{}", self.username, self.password));
        headers.insert("authorization", format!("Basic {}", credentials));
    }
}

/// OAuth2 access token sent as `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerAuth {
    pub token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth").field("token", &"***").finish()
    }
}

impl AuthScheme for BearerAuth {
    fn apply(&self, headers: &mut Headers, _query: &mut QueryParams) {
        headers.insert("authorization", format!("Bearer {}", self.token));
    }
}

/// Adapter turning a closure into an [`AuthScheme`].
pub struct FnAuth<F> {
    func: F,
}

impl<F> FnAuth<F>
where
    F: Fn(&mut Headers, &mut QueryParams) + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> AuthScheme for FnAuth<F>
where
    F: Fn(&mut Headers, &mut QueryParams) + Send + Sync,
{
    fn apply(&self, headers: &mut Headers, query: &mut QueryParams) {
        (self.func)(headers, query)
    }
}

/// Name -> scheme lookup table.
#[derive(Clone, Default)]
pub struct AuthRegistry {
    schemes: HashMap<String, Arc<dyn AuthScheme>>,
}

impl AuthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<A: AuthScheme + 'static>(mut self, name: impl Into<String>, scheme: A) -> Self {
        self.register(name, scheme);
        self
    }

    pub fn register<A: AuthScheme + 'static>(&mut self, name: impl Into<String>, scheme: A) {
        self.schemes.insert(name.into(), Arc::new(scheme));
    }

    pub fn register_arc(&mut self, name: impl Into<String>, scheme: Arc<dyn AuthScheme>) {
        self.schemes.insert(name.into(), scheme);
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.schemes.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AuthScheme>> {
        self.schemes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}

impl fmt::Debug for AuthRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.schemes.keys().collect();
        names.sort();
        f.debug_struct("AuthRegistry").field("schemes", &names).finish()
    }
}

/// Run each named scheme, in order, over `headers` and `query`.
pub fn apply_auth<S: AsRef<str>>(
    headers: &mut Headers,
    query: &mut QueryParams,
    auth_settings: &[S],
    registry: &AuthRegistry,
) {
    for name in auth_settings {
        let name = name.as_ref();
        match registry.get(name) {
            Some(scheme) => scheme.apply(headers, query),
            None => debug!(auth_scheme = name, "auth scheme not registered, skipping"),
        }
    }
}
