//! # sdk-runtime
//!
//! Generic HTTP API-client runtime underneath generated REST SDKs.
//!
//! ## Overview
//!
//! Generated endpoint methods describe each call declaratively (path, method,
//! query/header/body parameters, content-type candidates, auth scheme names)
//! and hand it to this runtime. The runtime negotiates `Accept` /
//! `Content-Type`, applies authentication, encodes the body, dispatches the
//! request on the tokio worker pool and delivers exactly one [`Completion`]
//! per request. Callers never block: `execute` returns a [`RequestId`]
//! immediately, which can be used to cancel the request while it is in flight.
//!
//! ## Key Features
//!
//! - **Client pool**: [`ClientPool`] keeps one shared [`ApiClient`] per base URL
//! - **Content negotiation**: [`negotiation::select_accept`] / [`negotiation::select_content_type`]
//! - **Pluggable auth**: named [`auth::AuthScheme`]s applied in order, last writer wins
//! - **Request tracking**: [`tracker::RequestTracker`] with best-effort cancellation
//! - **Error taxonomy**: transport, timeout, HTTP status, decoding and cancellation
//!   errors all arrive through the completion channel ([`ErrorKind`])
//! - **Logging hook**: optional [`logging::LoggingFilter`] over every request/response pair
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sdk_runtime::{ClientPool, RequestParams};
//!
//! #[tokio::main]
//! async fn main() -> sdk_runtime::Result<()> {
//!     let client = ClientPool::global()?.get("https://petstore.example.com/v2");
//!     client.set_default_header("User-Agent", "petstore-sdk/1.0");
//!
//!     let params = RequestParams::get("/pet/1")
//!         .accepts(["application/json", "application/xml"])
//!         .auth("api_key");
//!
//!     let (_id, response) = client.execute_future::<serde_json::Value>(params);
//!     let pet = response.await?;
//!     println!("{pet}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | `ApiClient`, `ClientPool` and the request executor |
//! | [`params`] | Declarative request parameters |
//! | [`negotiation`] | Accept / Content-Type selection |
//! | [`auth`] | Authentication schemes and registry |
//! | [`codec`] | Body encoders and response decoders |
//! | [`tracker`] | In-flight request registry |
//! | [`transport`] | HTTP engine boundary (reqwest by default) |
//! | [`logging`] | Request logging switch and filter |
//! | [`config`] | Runtime configuration and credentials |

pub mod auth;
pub mod client;
pub mod codec;
pub mod config;
pub mod logging;
pub mod negotiation;
pub mod params;
pub mod tracker;
pub mod transport;

// Re-export main types for convenience
pub use client::{ApiClient, ClientPool, Completion, RequestState, RequestSummary, ResponseFuture};
pub use config::Configuration;
pub use params::{
    escape, CollectionFormat, Headers, MultipartField, QueryParams, QueryValue, RequestBody,
    RequestOptions, RequestParams,
};
pub use reqwest::Method;
pub use tracker::{RequestId, TaskHandle};
pub use transport::{HttpEngine, RawResponse, ReqwestEngine};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};
