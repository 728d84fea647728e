use super::{HttpEngine, RawResponse, TransportBody, TransportError, TransportRequest};
use crate::config::Configuration;
use crate::error::{Error, ErrorContext};
use crate::params::MultipartField;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::Proxy;
use std::time::Instant;

/// Default engine backed by a pooled `reqwest::Client`.
///
/// Connection pooling, TLS and HTTP/2 are handled by reqwest; this type only
/// maps prepared requests onto it and normalizes failures.
#[derive(Clone)]
pub struct ReqwestEngine {
    client: reqwest::Client,
}

impl ReqwestEngine {
    pub fn new(config: &Configuration) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout))
            // Conservative HTTP/2 keepalive defaults for long-lived connections.
            .http2_adaptive_window(true)
            .http2_keep_alive_interval(Some(std::time::Duration::from_secs(30)))
            .http2_keep_alive_timeout(std::time::Duration::from_secs(10));

        if !config.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ua) = &config.user_agent {
            let mut headers = HeaderMap::new();
            let value = HeaderValue::from_str(ua).map_err(|e| {
                Error::configuration_with_context(
                    e.to_string(),
                    ErrorContext::new()
                        .with_field_path("user_agent")
                        .with_source("reqwest_engine"),
                )
            })?;
            headers.insert(USER_AGENT, value);
            builder = builder.default_headers(headers);
        }

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    e.to_string(),
                    ErrorContext::new()
                        .with_field_path("proxy_url")
                        .with_source("reqwest_engine"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client })
    }

    /// Wrap an existing client (shares its connection pool).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn header_map(request: &TransportRequest) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in request.headers.iter() {
            let context = || {
                ErrorContext::new()
                    .with_field_path(format!("headers.{}", name))
                    .with_source("reqwest_engine")
            };
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::validation_with_context(e.to_string(), context()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::validation_with_context(e.to_string(), context()))?;
            map.insert(name, value);
        }
        Ok(map)
    }

    fn multipart(fields: &[MultipartField]) -> Result<Form> {
        let mut form = Form::new();
        for field in fields {
            form = match field {
                MultipartField::Text { name, value } => form.text(name.clone(), value.clone()),
                MultipartField::File {
                    name,
                    file_name,
                    mime_type,
                    data,
                } => {
                    let mut part = Part::bytes(data.to_vec()).file_name(file_name.clone());
                    if let Some(mime) = mime_type {
                        part = part.mime_str(mime).map_err(|e| {
                            Error::validation_with_context(
                                e.to_string(),
                                ErrorContext::new()
                                    .with_field_path(format!("body.{}", name))
                                    .with_source("reqwest_engine"),
                            )
                        })?;
                    }
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }

    fn map_error(e: reqwest::Error, start: Instant) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                elapsed: start.elapsed(),
            }
        } else {
            Error::Transport(TransportError::Http(e))
        }
    }
}

#[async_trait]
impl HttpEngine for ReqwestEngine {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse> {
        let headers = Self::header_map(&request)?;

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(headers);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match &request.body {
            TransportBody::Empty => builder,
            TransportBody::Bytes(bytes) => builder.body(bytes.clone()),
            TransportBody::Multipart(fields) => builder.multipart(Self::multipart(fields)?),
        };

        let start = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(e, start))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(e, start))?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
