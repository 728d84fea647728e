//! API client, client pool and the request executor.
//!
//! Keep the public surface small: generated endpoint methods build a
//! [`RequestParams`](crate::RequestParams), call [`ApiClient::execute`] and
//! get a [`Completion`] back on the worker pool.

pub mod core;
mod execution;
pub mod pool;
pub mod types;

pub use self::core::ApiClient;
pub use pool::ClientPool;
pub use types::{Completion, RequestState, RequestSummary, ResponseFuture};
