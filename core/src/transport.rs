//! The I/O seam between the request engine and the network.
//!
//! # Design
//! The engine only ever sees `HttpRequest` and `HttpResponse` values. A
//! `Transport` turns the first into the second, or reports that no response
//! could be obtained. Any HTTP status, including 4xx and 5xx, counts as a
//! response; classification happens in the engine.
//!
//! `UreqTransport` is the production implementation. `ureq` is blocking, so
//! each call runs on Tokio's blocking pool and the caller only suspends at
//! the await point. Dropping the future (for example when a cancellation
//! token fires in the engine) abandons the await only: the blocking call
//! keeps running and the request itself completes, so the server may still
//! apply a cancelled POST, PUT or DELETE.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// The transport could not produce a response (connection refused, DNS,
/// TLS, timeout, broken body stream).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

/// Blocking `ureq` agent driven from the Tokio blocking pool.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl UreqTransport {
    /// Status codes are returned as data rather than `Err`, so 4xx/5xx reach
    /// the engine's classifier.
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || execute(&agent, request))
            .await
            .map_err(|e| TransportError::new(format!("transport task failed: {e}")))?
            .map_err(|e| TransportError::new(format!("Network request failed: {e}")))
    }
}

fn execute(agent: &ureq::Agent, request: HttpRequest) -> Result<HttpResponse, ureq::Error> {
    let HttpRequest {
        method,
        path,
        headers,
        body,
    } = request;

    let mut response = match method {
        HttpMethod::Get => with_headers(agent.get(&path), &headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(&path), &headers).call(),
        HttpMethod::Post => {
            let builder = with_headers(agent.post(&path), &headers);
            match body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
        HttpMethod::Put => {
            let builder = with_headers(agent.put(&path), &headers);
            match body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
    }?;

    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response.body_mut().read_to_string()?;

    Ok(HttpResponse {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body,
    })
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
