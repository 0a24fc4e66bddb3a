//! Scripted transport shared by the engine and client suites.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use seriestrack_core::{
    ApiClient, ClientConfig, HttpRequest, HttpResponse, Transport, TransportError,
};
use serde_json::Value;
use tokio::time::Instant;

type Scripted = Result<HttpResponse, TransportError>;

#[derive(Default)]
struct Inner {
    script: VecDeque<Scripted>,
    fallback: Option<Scripted>,
    requests: Vec<HttpRequest>,
    sent_at: Vec<Instant>,
}

/// Replays queued outcomes in order, then the fallback (if any). Records
/// every request and the (paused-clock) instant it was sent.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Scripted>) -> Self {
        let transport = Self::default();
        transport.inner.lock().unwrap().script = script.into();
        transport
    }

    pub fn always(outcome: Scripted) -> Self {
        let transport = Self::default();
        transport.inner.lock().unwrap().fallback = Some(outcome);
        transport
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }

    pub fn sent_at(&self) -> Vec<Instant> {
        self.inner.lock().unwrap().sent_at.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request);
        inner.sent_at.push(Instant::now());
        match inner.script.pop_front() {
            Some(outcome) => outcome,
            None => inner
                .fallback
                .clone()
                .unwrap_or_else(|| Err(TransportError::new("script exhausted"))),
        }
    }
}

pub const BASE_URL: &str = "http://localhost:7071/api";

pub fn client(transport: &ScriptedTransport) -> ApiClient<ScriptedTransport> {
    ApiClient::with_transport(&ClientConfig::new(BASE_URL), transport.clone())
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

pub fn json(status: u16, body: Value) -> Scripted {
    Ok(HttpResponse {
        status,
        status_text: reason(status).to_string(),
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.to_string(),
    })
}

pub fn status(status: u16) -> Scripted {
    Ok(HttpResponse {
        status,
        status_text: reason(status).to_string(),
        headers: Vec::new(),
        body: String::new(),
    })
}

pub fn refused() -> Scripted {
    Err(TransportError::new("connection refused"))
}
