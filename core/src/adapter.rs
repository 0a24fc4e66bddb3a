//! Observable loading/error/data state around asynchronous API calls.
//!
//! # Design
//! `ApiCall` owns one `CallState` behind a `tokio::sync::watch` channel: the
//! owner mutates it, any number of observers read snapshots or await
//! changes. Failures are translated to display copy here and nowhere else,
//! then the original `ApiError` is returned to the caller as well.
//!
//! `Query` layers auto-fetching on top: it runs when enabled, re-runs when
//! its query function is replaced, and retries transient failures with the
//! same doubling backoff as the request engine. Pending retry timers live
//! inside the returned future, so dropping the future (or the `Query`)
//! stops them and no state is touched afterwards.

use std::future::Future;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::retry::RetryPolicy;

pub const NETWORK_ERROR_MESSAGE: &str =
    "Unable to connect to the server. Please check your internet connection and try again.";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";
pub const CANNOT_RETRY_MESSAGE: &str = "Cannot retry this operation";

/// Display copy for a failure.
pub fn user_message(err: &ApiError) -> String {
    match err {
        ApiError::Validation { message, .. } => message.clone(),
        ApiError::Transport { .. } => NETWORK_ERROR_MESSAGE.to_string(),
        ApiError::Response {
            status, message, ..
        } => match *status {
            401 => "Please log in to continue.".to_string(),
            403 => "You do not have permission to perform this action.".to_string(),
            404 => "The requested resource was not found.".to_string(),
            429 => "Too many requests. Please wait a moment and try again.".to_string(),
            500 => "A server error occurred. Please try again later.".to_string(),
            502..=504 => {
                "The service is temporarily unavailable. Please try again later.".to_string()
            }
            _ if !message.is_empty() => message.clone(),
            _ => UNEXPECTED_ERROR_MESSAGE.to_string(),
        },
        ApiError::Serialization(_) | ApiError::Deserialization(_) | ApiError::Cancelled { .. } => {
            UNEXPECTED_ERROR_MESSAGE.to_string()
        }
    }
}

/// Loading/error/data snapshot of one call site.
#[derive(Debug, Clone, PartialEq)]
pub struct CallState<T> {
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<T>,
    failure: Option<ApiError>,
}

impl<T> Default for CallState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            data: None,
            failure: None,
        }
    }
}

impl<T> CallState<T> {
    /// The failure behind `error`, if the last call failed.
    pub fn failure(&self) -> Option<&ApiError> {
        self.failure.as_ref()
    }

    pub fn can_retry(&self) -> bool {
        self.failure.as_ref().is_some_and(ApiError::is_retryable)
    }
}

type SuccessCallback<T> = Box<dyn Fn(&T) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Wraps asynchronous calls with observable `CallState`.
pub struct ApiCall<T> {
    state: watch::Sender<CallState<T>>,
    on_success: Option<SuccessCallback<T>>,
    on_error: Option<ErrorCallback>,
}

impl<T> Default for ApiCall<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ApiCall<T> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(CallState::default());
        Self {
            state,
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<CallState<T>> {
        self.state.subscribe()
    }

    /// Back to the initial state.
    pub fn reset(&self) {
        self.state.send_replace(CallState::default());
    }
}

impl<T: Clone> ApiCall<T> {
    pub fn state(&self) -> CallState<T> {
        self.state.borrow().clone()
    }

    /// Run `call`, tracking its progress in the state. The result, success
    /// or failure, is handed back unchanged.
    pub async fn execute<F, Fut>(&self, call: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
            state.failure = None;
        });

        match call().await {
            Ok(value) => {
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = None;
                    state.failure = None;
                    state.data = Some(value.clone());
                });
                if let Some(callback) = &self.on_success {
                    callback(&value);
                }
                Ok(value)
            }
            Err(err) => {
                let message = user_message(&err);
                debug!(error = %err, display = %message, "call failed");
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(message.clone());
                    state.failure = Some(err.clone());
                    state.data = None;
                });
                if let Some(callback) = &self.on_error {
                    callback(&message);
                }
                Err(err)
            }
        }
    }

    /// Re-run `call` only when the last failure is retryable. Otherwise
    /// fails with "Cannot retry this operation" and `call` is not invoked.
    pub async fn retry<F, Fut>(&self, call: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if !self.state.borrow().can_retry() {
            return Err(ApiError::validation(CANNOT_RETRY_MESSAGE));
        }
        self.execute(call).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub enabled: bool,
    pub retry: RetryPolicy,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// An `ApiCall` driven by a stored query function.
pub struct Query<T, Q> {
    call: ApiCall<T>,
    query: Q,
    options: QueryOptions,
}

impl<T, Q, Fut> Query<T, Q>
where
    T: Clone,
    Q: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    pub fn new(query: Q, options: QueryOptions) -> Self {
        Self {
            call: ApiCall::new(),
            query,
            options,
        }
    }

    pub fn call(&self) -> &ApiCall<T> {
        &self.call
    }

    pub fn state(&self) -> CallState<T> {
        self.call.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState<T>> {
        self.call.subscribe()
    }

    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    /// Initial fetch. `None` when the query is disabled.
    pub async fn mount(&self) -> Option<Result<T, ApiError>> {
        if !self.options.enabled {
            return None;
        }
        Some(self.fetch().await)
    }

    /// Swap the query function and fetch again when enabled.
    pub async fn replace_query(&mut self, query: Q) -> Option<Result<T, ApiError>> {
        self.query = query;
        self.mount().await
    }

    /// Fetches when the query goes from disabled to enabled.
    pub async fn set_enabled(&mut self, enabled: bool) -> Option<Result<T, ApiError>> {
        let was_enabled = self.options.enabled;
        self.options.enabled = enabled;
        if enabled && !was_enabled {
            self.mount().await
        } else {
            None
        }
    }

    /// Manual fetch, regardless of `enabled`.
    pub async fn refetch(&self) -> Result<T, ApiError> {
        self.fetch().await
    }

    async fn fetch(&self) -> Result<T, ApiError> {
        let policy = self.options.retry;
        let mut attempt = 0;
        loop {
            match self.call.execute(&self.query).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                    let delay_ms = policy.delay_millis(attempt);
                    warn!(attempt, delay_ms, error = %err, "query failed, retrying");
                    tokio::time::sleep(policy.delay(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
