//! Request engine: one logical HTTP call with classification and bounded
//! retry.
//!
//! # Design
//! Classification is a pure function over `HttpResponse` (`classify_response`)
//! and the retry loop only decides whether to wait and go again. The engine
//! holds no state between calls beyond its configuration, so concurrent
//! requests through one engine are independent.

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ApiError, ErrorBody};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::retry::RetryPolicy;
use crate::transport::Transport;

/// Per-call options: method, extra headers, JSON body and an optional
/// cancellation token.
///
/// A fired token stops the engine waiting on the current attempt or backoff
/// and prevents further attempts. Whether the attempt itself is interrupted
/// depends on the transport; `UreqTransport` lets it finish.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn delete() -> Self {
        Self {
            method: HttpMethod::Delete,
            ..Self::default()
        }
    }

    /// Method with a JSON-encoded body.
    pub fn json<B: Serialize + ?Sized>(method: HttpMethod, body: &B) -> Result<Self, ApiError> {
        let body =
            serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(Self {
            method,
            body: Some(body),
            ..Self::default()
        })
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// What the retry loop should do with one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// 2xx. `None` for empty or non-JSON bodies.
    Success(Option<Value>),
    /// Transient status; the error is what the caller sees once retries run
    /// out.
    Retry(ApiError),
    /// Final failure, no retry.
    Fail(ApiError),
}

/// Map one response to success, retry or failure.
pub fn classify_response(endpoint: &str, response: &HttpResponse) -> Disposition {
    if response.is_success() {
        return match parse_success_body(response) {
            Ok(value) => Disposition::Success(value),
            Err(err) => Disposition::Fail(err),
        };
    }

    let status = response.status;
    let parsed = ErrorBody::message_from(&response.body).unwrap_or_else(|| {
        format!("Request failed: {} {}", status, response.status_text)
            .trim_end()
            .to_string()
    });
    let failure = |message: String| ApiError::Response {
        status,
        status_text: response.status_text.clone(),
        message,
        endpoint: endpoint.to_string(),
    };

    match status {
        400 => Disposition::Fail(ApiError::validation(parsed)),
        401 => Disposition::Fail(failure("Authentication required".to_string())),
        403 => Disposition::Fail(failure("Access denied".to_string())),
        404 => Disposition::Fail(failure(format!("Resource not found: {endpoint}"))),
        429 => Disposition::Retry(failure("Rate limit exceeded".to_string())),
        500 => Disposition::Fail(failure("Server error occurred".to_string())),
        502..=504 => Disposition::Retry(failure("Service temporarily unavailable".to_string())),
        _ => Disposition::Fail(failure(parsed)),
    }
}

fn parse_success_body(response: &HttpResponse) -> Result<Option<Value>, ApiError> {
    if !response.is_json() || response.body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&response.body)
        .map(Some)
        .map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Issues requests against one base URL through a `Transport`.
#[derive(Debug, Clone)]
pub struct RequestEngine<T> {
    base_url: String,
    transport: T,
    retry: RetryPolicy,
}

impl<T: Transport> RequestEngine<T> {
    pub fn new(base_url: &str, transport: T, retry: RetryPolicy) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the plain-data request for `endpoint`. The JSON content type
    /// is always present unless a caller header of the same name replaces
    /// it.
    pub fn build_request(&self, endpoint: &str, options: &RequestOptions) -> HttpRequest {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        for (name, value) in &options.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        HttpRequest {
            method: options.method,
            path: format!("{}{}", self.base_url, endpoint),
            headers,
            body: options.body.clone(),
        }
    }

    /// `request_with_retries` with the configured retry ceiling.
    pub async fn request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>, ApiError> {
        self.request_with_retries(endpoint, options, self.retry.max_retries)
            .await
    }

    /// Perform the call, retrying transport failures and transient statuses
    /// up to `max_retries` times with `delay(attempt)` between attempts.
    pub async fn request_with_retries(
        &self,
        endpoint: &str,
        options: RequestOptions,
        max_retries: u32,
    ) -> Result<Option<Value>, ApiError> {
        let request = self.build_request(endpoint, &options);
        let mut attempt: u32 = 0;

        loop {
            debug!(method = request.method.as_str(), endpoint, attempt, "sending request");

            let sent = self.transport.send(request.clone());
            let outcome = match &options.cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(cancelled(endpoint)),
                    outcome = sent => outcome,
                },
                None => sent.await,
            };

            let failure = match outcome {
                Ok(response) => match classify_response(endpoint, &response) {
                    Disposition::Success(value) => return Ok(value),
                    Disposition::Fail(err) => return Err(err),
                    Disposition::Retry(err) => err,
                },
                Err(err) => ApiError::Transport {
                    message: err.message,
                    endpoint: endpoint.to_string(),
                },
            };

            if attempt >= max_retries {
                warn!(endpoint, attempts = attempt + 1, error = %failure, "giving up after retries");
                return Err(failure);
            }

            let delay = self.retry.delay(attempt);
            let delay_ms = self.retry.delay_millis(attempt);
            warn!(endpoint, attempt, delay_ms, error = %failure, "retrying request");
            match &options.cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(cancelled(endpoint)),
                    _ = tokio::time::sleep(delay) => {}
                },
                None => tokio::time::sleep(delay).await,
            }
            attempt += 1;
        }
    }
}

fn cancelled(endpoint: &str) -> ApiError {
    debug!(endpoint, "request cancelled");
    ApiError::Cancelled {
        endpoint: endpoint.to_string(),
    }
}
