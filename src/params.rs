//! Declarative request parameters handed to the executor by generated code.
//!
//! A `RequestParams` value describes one REST call completely: path, method,
//! query/header parameters, body, per-request options, auth scheme names and
//! the content-type candidates. The executor never mutates the caller's value;
//! it works on a local copy while negotiating and authenticating.

use bytes::Bytes;
use reqwest::Method;
use std::collections::BTreeMap;
use std::time::Duration;

/// Case-insensitive header parameters.
///
/// Names are stored lowercased, so `Accept` and `accept` address the same
/// entry and later inserts overwrite earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Insert only when no value is present for `name`.
    pub fn insert_if_absent(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> bool {
        let key = name.as_ref().to_ascii_lowercase();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, value.into());
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// Overlay `other` on top of `self`; entries in `other` win.
    pub fn extend(&mut self, other: &Headers) {
        for (k, v) in other.iter() {
            self.entries.insert(k.to_string(), v.to_string());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// How a list-valued query parameter is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionFormat {
    /// `k=a,b`
    #[default]
    Csv,
    /// `k=a b`
    Ssv,
    /// `k=a\tb`
    Tsv,
    /// `k=a|b`
    Pipes,
    /// `k=a&k=b`
    Multi,
}

impl CollectionFormat {
    fn separator(self) -> Option<&'static str> {
        match self {
            CollectionFormat::Csv => Some(","),
            CollectionFormat::Ssv => Some(" "),
            CollectionFormat::Tsv => Some("\t"),
            CollectionFormat::Pipes => Some("|"),
            CollectionFormat::Multi => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    Multi(Vec<String>, CollectionFormat),
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Single(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Single(v)
    }
}

/// Query parameters keyed by name. A key appears once; repeated values are
/// expressed through `QueryValue::Multi`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: BTreeMap<String, QueryValue>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<QueryValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<QueryValue> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten into `(key, value)` pairs ready for URL encoding.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            match value {
                QueryValue::Single(v) => pairs.push((key.clone(), v.clone())),
                QueryValue::Multi(values, format) => match format.separator() {
                    Some(sep) => pairs.push((key.clone(), values.join(sep))),
                    None => {
                        for v in values {
                            pairs.push((key.clone(), v.clone()));
                        }
                    }
                },
            }
        }
        pairs
    }
}

/// One field of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq)]
pub enum MultipartField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime_type: Option<String>,
        data: Bytes,
    },
}

/// Request payload. Structured JSON values are encoded according to the
/// negotiated content type; raw bytes and multipart forms pass through.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Bytes(Bytes),
    Multipart(Vec<MultipartField>),
}

/// Per-request overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
}

/// Fully-formed description of one REST call.
#[derive(Debug, Clone)]
pub struct RequestParams {
    pub path: String,
    pub method: Method,
    pub query_params: QueryParams,
    pub body: Option<RequestBody>,
    pub header_params: Headers,
    pub options: RequestOptions,
    pub auth_settings: Vec<String>,
    pub accepts: Vec<String>,
    pub content_types: Vec<String>,
}

impl RequestParams {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            query_params: QueryParams::new(),
            body: None,
            header_params: Headers::new(),
            options: RequestOptions::default(),
            auth_settings: Vec::new(),
            accepts: Vec::new(),
            content_types: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query_params.insert(name, value);
        self
    }

    pub fn query_list<I, S>(mut self, name: impl Into<String>, values: I, format: CollectionFormat) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.query_params
            .insert(name, QueryValue::Multi(values, format));
        self
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.header_params.insert(name, value);
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json_body(self, value: serde_json::Value) -> Self {
        self.body(RequestBody::Json(value))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn auth(mut self, scheme: impl Into<String>) -> Self {
        self.auth_settings.push(scheme.into());
        self
    }

    pub fn accepts<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepts = candidates.into_iter().map(Into::into).collect();
        self
    }

    pub fn content_types<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_types = candidates.into_iter().map(Into::into).collect();
        self
    }
}

/// Percent-encode a value for use inside a path or query segment.
pub fn escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
