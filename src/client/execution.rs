//! Request execution: negotiation, auth, encoding, dispatch and completion.

use crate::auth::apply_auth;
use crate::codec::{JsonDecoder, ResponseDecoder, MULTIPART_FORM_DATA};
use crate::error::{Error, ErrorContext};
use crate::negotiation::{essence, select_accept, select_content_type};
use crate::params::{Headers, RequestBody, RequestParams};
use crate::tracker::{RequestId, TaskHandle};
use crate::transport::{RawResponse, TransportBody, TransportError, TransportRequest};
use crate::Result;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

use super::core::ApiClient;
use super::types::{Completion, RequestState, RequestSummary, ResponseFuture};

impl ApiClient {
    /// Dispatch a request and decode a successful body as JSON into `T`.
    ///
    /// Returns immediately with the request id; `on_complete` runs exactly once
    /// on the runtime's worker pool when the request terminates.
    pub fn execute<T, F>(self: &Arc<Self>, params: RequestParams, on_complete: F) -> RequestId
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Completion<T>) + Send + 'static,
    {
        self.execute_with_decoder(params, JsonDecoder::<T>::new(), on_complete)
    }

    /// Like [`execute`](Self::execute) with a caller-supplied decoder.
    pub fn execute_with_decoder<T, D, F>(
        self: &Arc<Self>,
        params: RequestParams,
        decoder: D,
        on_complete: F,
    ) -> RequestId
    where
        T: Send + 'static,
        D: ResponseDecoder<T> + 'static,
        F: FnOnce(Completion<T>) + Send + 'static,
    {
        let started = Instant::now();
        let prepared = self.prepare(&params);

        let (url, headers) = match &prepared {
            Ok(req) => (req.url.clone(), req.headers.clone()),
            Err(_) => (self.join_path(&params.path), params.header_params.clone()),
        };

        let task = TaskHandle::new(params.method.clone(), url.clone());
        let token = task.token();
        let id = self.tracker.register(task);

        let summary = RequestSummary {
            id,
            method: params.method.clone(),
            url,
            headers,
        };

        debug!(
            request_id = %id,
            method = %summary.method,
            url = summary.url.as_str(),
            state = ?RequestState::Dispatched,
            "dispatching request"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let client = Arc::clone(self);
                handle.spawn(async move {
                    let outcome = match prepared {
                        // A panicking engine must still reach `finish`.
                        Ok(request) => AssertUnwindSafe(client.send(request, &token))
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|panic| {
                                let message = panic_message(panic.as_ref());
                                warn!(request_id = %id, panic = message.as_str(), "http engine panicked");
                                Err(Error::Transport(TransportError::Other(format!(
                                    "http engine panicked: {}",
                                    message
                                ))))
                            }),
                        Err(e) => Err(e),
                    };
                    client.finish(id, summary, outcome, &token, started, decoder, on_complete);
                });
            }
            Err(_) => {
                let err = Error::configuration_with_context(
                    "execute requires a running tokio runtime",
                    ErrorContext::new().with_source("executor"),
                );
                self.finish(id, summary, Err(err), &token, started, decoder, on_complete);
            }
        }

        id
    }

    /// Dispatch a request and await the decoded JSON body.
    pub fn execute_future<T>(self: &Arc<Self>, params: RequestParams) -> (RequestId, ResponseFuture<T>)
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let id = self.execute::<T, _>(params, move |completion| {
            let _ = tx.send(completion.result);
        });
        (id, ResponseFuture::new(id, rx))
    }

    pub(crate) fn join_path(&self, path: &str) -> String {
        if path.is_empty() || path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Build the wire request: default headers snapshot, negotiation, auth, encoding.
    pub(crate) fn prepare(&self, params: &RequestParams) -> Result<TransportRequest> {
        // Explicit header params override the defaults.
        let mut headers = Headers::clone(&self.default_headers.load());
        headers.extend(&params.header_params);

        // Negotiated values never replace explicit ones.
        headers.insert_if_absent("accept", select_accept(&params.accepts));
        let content_type = match headers.get("content-type") {
            Some(ct) => ct.to_string(),
            None => select_content_type(&params.content_types),
        };
        trace!(state = ?RequestState::Negotiated, content_type = content_type.as_str());

        let mut query = params.query_params.clone();
        apply_auth(
            &mut headers,
            &mut query,
            &params.auth_settings,
            &self.auth.load(),
        );
        trace!(state = ?RequestState::Authenticated, schemes = params.auth_settings.len());

        let body = match &params.body {
            None => TransportBody::Empty,
            Some(RequestBody::Json(value)) => {
                headers.insert_if_absent("content-type", content_type.as_str());
                TransportBody::Bytes(self.encoders.load().encode(&content_type, value)?)
            }
            Some(RequestBody::Bytes(bytes)) => {
                headers.insert_if_absent("content-type", content_type.as_str());
                TransportBody::Bytes(bytes.clone())
            }
            Some(RequestBody::Multipart(fields)) => {
                // The engine writes the multipart content type with its boundary.
                if let Some(ct) = headers.remove("content-type") {
                    if essence(&ct) != MULTIPART_FORM_DATA {
                        debug!(content_type = ct.as_str(), "dropping content type for multipart body");
                    }
                }
                TransportBody::Multipart(fields.clone())
            }
        };

        let url = self.build_url(&params.path, &query.to_pairs())?;

        Ok(TransportRequest {
            method: params.method.clone(),
            url,
            headers,
            body,
            timeout: params.options.timeout.or(self.default_timeout),
        })
    }

    fn build_url(&self, path: &str, query: &[(String, String)]) -> Result<String> {
        let joined = self.join_path(path);
        let mut url = Url::parse(&joined).map_err(|e| {
            Error::validation_with_context(
                format!("invalid request url: {}", e),
                ErrorContext::new()
                    .with_field_path("path")
                    .with_details(joined.clone())
                    .with_source("executor"),
            )
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }

    async fn send(&self, request: TransportRequest, token: &CancellationToken) -> Result<RawResponse> {
        let timeout = request.timeout;
        let exchange = async {
            match timeout {
                Some(limit) => {
                    let start = Instant::now();
                    match tokio::time::timeout(limit, self.engine.send(request)).await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(Error::Timeout {
                            elapsed: start.elapsed(),
                        }),
                    }
                }
                None => self.engine.send(request).await,
            }
        };

        // Dropping the exchange aborts the engine call.
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            outcome = exchange => outcome,
        }
    }

    /// Terminal transition. The tracker entry is released before any hook or
    /// callback runs, so a panicking callback cannot leak it.
    #[allow(clippy::too_many_arguments)]
    fn finish<T, D, F>(
        &self,
        id: RequestId,
        summary: RequestSummary,
        outcome: Result<RawResponse>,
        token: &CancellationToken,
        started: Instant,
        decoder: D,
        on_complete: F,
    ) where
        D: ResponseDecoder<T>,
        F: FnOnce(Completion<T>),
    {
        let removed = self.tracker.remove(id).is_some();
        // A successful `cancel` already removed the entry; honour it even if the
        // exchange raced to completion.
        let outcome = if !removed && token.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            outcome
        };

        let (result, response) = match outcome {
            Ok(raw) => {
                let result = if raw.is_success() {
                    catch_unwind(AssertUnwindSafe(|| decoder.decode(&raw))).unwrap_or_else(
                        |panic| {
                            let message = panic_message(panic.as_ref());
                            warn!(request_id = %id, panic = message.as_str(), "response decoder panicked");
                            Err(Error::decoding(
                                format!("decoder panicked: {}", message),
                                raw.body.clone(),
                            ))
                        },
                    )
                } else {
                    Err(Error::HttpStatus {
                        status: raw.status,
                        body: raw.body.clone(),
                        headers: raw.headers.clone(),
                    })
                };
                (result, Some(raw))
            }
            Err(e) => (Err(e), None),
        };

        let elapsed: Duration = started.elapsed();
        self.log.observe(
            self,
            &summary,
            response.as_ref(),
            result.as_ref().err(),
            elapsed,
        );

        let completion = Completion {
            request_id: id,
            result,
            request: summary,
            response,
            elapsed,
        };
        debug!(request_id = %id, state = ?completion.state(), "request finished");
        on_complete(completion);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
