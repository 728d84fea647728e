use crate::params::Headers;
use crate::tracker::RequestId;
use crate::transport::RawResponse;
use crate::{Error, Result};
use futures::FutureExt;
use reqwest::Method;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;

/// Lifecycle of a single request.
///
/// `Built -> Negotiated -> Authenticated -> Dispatched -> {Completed, Failed, Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Built,
    Negotiated,
    Authenticated,
    Dispatched,
    Completed,
    Failed,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Completed | RequestState::Failed | RequestState::Cancelled
        )
    }
}

/// What was sent, as seen by logging filters and completion callbacks.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub id: RequestId,
    pub method: Method,
    /// Full URL including the encoded query string.
    pub url: String,
    pub headers: Headers,
}

/// Terminal outcome of a request, delivered exactly once.
#[derive(Debug)]
pub struct Completion<T> {
    pub request_id: RequestId,
    pub result: Result<T>,
    pub request: RequestSummary,
    /// Raw response, when the server answered (including non-2xx answers).
    pub response: Option<RawResponse>,
    pub elapsed: Duration,
}

impl<T> Completion<T> {
    pub fn state(&self) -> RequestState {
        match &self.result {
            Ok(_) => RequestState::Completed,
            Err(Error::Cancelled) => RequestState::Cancelled,
            Err(_) => RequestState::Failed,
        }
    }

    pub fn into_result(self) -> Result<T> {
        self.result
    }
}

/// Future adapter over the completion callback. Resolves to the decoded value
/// or the request's error.
#[derive(Debug)]
pub struct ResponseFuture<T> {
    request_id: RequestId,
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> ResponseFuture<T> {
    pub(crate) fn new(request_id: RequestId, rx: oneshot::Receiver<Result<T>>) -> Self {
        Self { request_id, rx }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

impl<T> Future for ResponseFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(self.rx.poll_unpin(cx)) {
            Ok(result) => Poll::Ready(result),
            // Sender dropped without a value: the request task died before completing.
            Err(_) => Poll::Ready(Err(Error::Cancelled)),
        }
    }
}
