//! Request dispatcher for the Halyard REST API
//!
//! Every resource call funnels through [`Dispatcher::dispatch`]: the payload is
//! serialized to JSON, one request is issued against a path relative to the
//! base URL, and the outcome is reported to a [`DispatchObserver`] before it is
//! handed back to the caller untouched.

use super::error::ApiError;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

/// Content type sent with every request
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Maximum length of response body to log (to avoid flooding the log)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = match body.char_indices().nth(MAX_LOG_BODY_LENGTH) {
        Some((cut, _)) => format!("{}... [truncated, {} bytes total]", &body[..cut], body.len()),
        None => body.to_string(),
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP verbs used by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One request, built by a resource caller and consumed by a single dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Human-readable description, logged before the request goes out
    pub label: String,
    /// Path relative to the API base URL
    pub path: String,
    pub method: Method,
    /// JSON object sent as the request body
    pub payload: Map<String, Value>,
}

impl RequestDescriptor {
    /// Create a descriptor with an empty payload
    pub fn new(label: impl Into<String>, path: impl Into<String>, method: Method) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            method,
            payload: Map::new(),
        }
    }

    /// Replace the payload
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Whether the payload travels as a request body.
    ///
    /// GET and DELETE with nothing to say go out bodyless; POST always sends
    /// its serialized payload.
    pub fn has_body(&self) -> bool {
        self.method == Method::Post || !self.payload.is_empty()
    }
}

/// Side-effecting hooks around a dispatch.
///
/// `on_start` runs before the request is issued; exactly one of `on_success`
/// or `on_failure` runs once the outcome is known. Hooks only borrow the
/// outcome, so they cannot change what the caller receives.
pub trait DispatchObserver: Send + Sync {
    fn on_start(&self, request: &RequestDescriptor);
    fn on_success(&self, request: &RequestDescriptor, result: &Value);
    fn on_failure(&self, request: &RequestDescriptor, error: &ApiError);
}

/// Default observer: writes labels and outcomes to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn on_start(&self, request: &RequestDescriptor) {
        tracing::info!("{}", request.label);
    }

    fn on_success(&self, _request: &RequestDescriptor, result: &Value) {
        tracing::info!("Result: {}", sanitize_for_log(&result.to_string()));
    }

    fn on_failure(&self, _request: &RequestDescriptor, error: &ApiError) {
        match error {
            ApiError::Status { status, body } => {
                tracing::error!("Error: {} - {}", status, sanitize_for_log(body));
            }
            other => tracing::error!("Error: {}", other),
        }
    }
}

/// Parse a base URL, making sure relative paths resolve beneath it
pub fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Issues JSON requests against the API base URL
#[derive(Clone)]
pub struct Dispatcher {
    client: Client,
    base_url: Url,
    observer: Arc<dyn DispatchObserver>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher logging through [`TracingObserver`]
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("halyard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            observer: Arc::new(TracingObserver),
        })
    }

    /// Swap the observer notified around each dispatch
    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a relative path against the base URL
    pub fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    /// Issue one request and report its outcome.
    ///
    /// The result is returned exactly as produced; observers see it first but
    /// cannot alter it.
    pub async fn dispatch(&self, request: RequestDescriptor) -> Result<Value, ApiError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            %request_id,
            method = %request.method,
            path = %request.path
        );

        async move {
            self.observer.on_start(&request);

            let outcome = self.send(&request).await;
            match &outcome {
                Ok(result) => self.observer.on_success(&request, result),
                Err(error) => self.observer.on_failure(&request, error),
            }

            outcome
        }
        .instrument(span)
        .await
    }

    /// Dispatch on the runtime and return the handle immediately
    pub fn spawn(&self, request: RequestDescriptor) -> JoinHandle<Result<Value, ApiError>> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.dispatch(request).await })
    }

    async fn send(&self, request: &RequestDescriptor) -> Result<Value, ApiError> {
        let url = self.resolve(&request.path)?;
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, "application/json");

        if request.has_body() {
            let body = serde_json::to_vec(&request.payload).map_err(ApiError::Encode)?;
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }

        // Handle empty response
        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(ApiError::Decode)
    }
}
