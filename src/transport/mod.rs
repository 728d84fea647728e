//! Outbound HTTP boundary.
//!
//! The executor talks to the network only through [`HttpEngine`]. The default
//! engine is [`ReqwestEngine`]; tests and embedders can inject their own.

pub mod http;

pub use http::ReqwestEngine;

use crate::params::{Headers, MultipartField};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::time::Duration;

/// Encoded body ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportBody {
    Empty,
    Bytes(Bytes),
    Multipart(Vec<MultipartField>),
}

/// A fully prepared request: negotiated, authenticated and encoded. `url`
/// already carries the encoded query string.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: TransportBody,
    pub timeout: Option<Duration>,
}

/// Raw response as received from the engine, before status checks or decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// The underlying HTTP engine. Implementations run on the tokio worker pool;
/// dropping the returned future must abort the in-flight exchange.
#[async_trait]
pub trait HttpEngine: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
