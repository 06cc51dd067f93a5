//! Single-attempt authenticated request dispatch.
//!
//! Every call made on behalf of the dashboard goes through
//! [`RequestPipeline::dispatch`], which:
//! 1. resolves the path against the configured base URL,
//! 2. attaches `Authorization: Bearer <token>` when a token is stored,
//! 3. attaches whatever client context (`X-IP`, `X-Location`) could be gathered,
//! 4. sends exactly once and classifies the outcome.
//!
//! The pipeline never retries and never changes session state; a 401 is an
//! ordinary [`PipelineError::Http`] for the caller to interpret.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

pub use reqwest::Method;

use merchantdesk_auth::bearer_value;

use crate::config::ClientConfig;
use crate::enrichment::Enricher;
use crate::storage::TokenReader;

/// A received non-2xx response.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("HTTP {status}: {}", server_message(.body).unwrap_or("no message"))]
pub struct StructuredHttpError {
    pub status: u16,
    /// Parsed JSON body, or the raw text as a JSON string.
    pub body: Value,
}

impl StructuredHttpError {
    /// Server-provided message (`{"message": ".."}`, `{"error": ".."}` or a text body).
    pub fn message(&self) -> Option<&str> {
        server_message(&self.body)
    }
}

fn server_message(body: &Value) -> Option<&str> {
    match body {
        Value::String(text) if !text.is_empty() => Some(text),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str),
        _ => None,
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// No response could be obtained (connection refused, DNS, timeout, ...).
    #[error("service unreachable: {reason}")]
    ServiceUnreachable { reason: String, timed_out: bool },

    #[error(transparent)]
    Http(#[from] StructuredHttpError),

    /// The request descriptor could not be turned into a request. Never sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl PipelineError {
    pub fn status(&self) -> Option<u16> {
        match self {
            PipelineError::Http(err) => Some(err.status),
            _ => None,
        }
    }

    /// Whether the server rejected the credential. Reacting is up to the caller.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Request descriptor: method, base-relative path, optional JSON body and headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, PipelineError> {
        let value = serde_json::to_value(body)
            .map_err(|e| PipelineError::InvalidRequest(format!("unserializable body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Parsed JSON body; `Null` for empty bodies.
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PipelineError> {
        serde_json::from_value(self.body.clone()).map_err(|e| PipelineError::Decode(e.to_string()))
    }
}

#[derive(Debug)]
pub struct RequestPipeline {
    http: reqwest::Client,
    base_url: Url,
    tokens: TokenReader,
    enricher: Enricher,
}

impl RequestPipeline {
    pub fn new(
        config: &ClientConfig,
        tokens: TokenReader,
        enricher: Enricher,
    ) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                PipelineError::InvalidRequest(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            tokens,
            enricher,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Dispatch `request` once.
    ///
    /// Header attachment (token, then client context) always completes before
    /// the request is sent. Enrichment failures are absorbed here.
    pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, PipelineError> {
        let request_id = Uuid::now_v7();
        let url = self.resolve(&request.path)?;
        let mut headers = caller_headers(&request.headers)?;

        match self.tokens.access_token().await {
            Ok(Some(token)) => match HeaderValue::from_str(&bearer_value(&token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!(
                    %request_id,
                    "stored access token is not a valid header value; sending without it"
                ),
            },
            Ok(None) => {
                tracing::debug!(%request_id, "no access token stored; sending unauthenticated")
            }
            Err(err) => tracing::warn!(
                %request_id,
                error = %err,
                "failed to read access token; sending unauthenticated"
            ),
        }

        let context = self.enricher.gather().await;
        context.apply(&mut headers);

        tracing::debug!(
            %request_id,
            method = %request.method,
            %url,
            enriched_ip = context.ip.is_some(),
            enriched_location = context.location.is_some(),
            "dispatching request"
        );

        let mut builder = self.http.request(request.method.clone(), url).headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            let err = classify_transport_error(&e);
            tracing::warn!(
                %request_id,
                method = %request.method,
                path = %request.path,
                error = %err,
                "request failed without a response"
            );
            err
        })?;

        let status = response.status();
        let response_headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(|e| {
            let err = classify_transport_error(&e);
            tracing::warn!(
                %request_id,
                status = status.as_u16(),
                error = %err,
                "response body could not be read"
            );
            err
        })?;
        let body = parse_body(&bytes);

        if !status.is_success() {
            tracing::info!(
                %request_id,
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                "request answered with error status"
            );
            return Err(PipelineError::Http(StructuredHttpError {
                status: status.as_u16(),
                body,
            }));
        }

        tracing::debug!(%request_id, status = status.as_u16(), "request succeeded");

        Ok(ApiResponse {
            status: status.as_u16(),
            headers: response_headers,
            body,
        })
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, PipelineError> {
        self.dispatch(ApiRequest::get(path)).await
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<ApiResponse, PipelineError> {
        self.dispatch(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<ApiResponse, PipelineError> {
        self.dispatch(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, PipelineError> {
        self.dispatch(ApiRequest::delete(path)).await
    }

    /// Join a base-relative path onto the base URL.
    ///
    /// Absolute URLs are refused so the bearer token cannot leak to another origin.
    fn resolve(&self, path: &str) -> Result<Url, PipelineError> {
        if Url::parse(path).is_ok() {
            return Err(PipelineError::InvalidRequest(format!(
                "path must be relative to the base URL, got '{path}'"
            )));
        }

        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| PipelineError::InvalidRequest(format!("invalid path '{path}': {e}")))
    }
}

fn caller_headers(pairs: &[(String, String)]) -> Result<HeaderMap, PipelineError> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| PipelineError::InvalidRequest(format!("invalid header name '{name}'")))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            PipelineError::InvalidRequest(format!("invalid value for header '{name}'"))
        })?;
        headers.append(name, value);
    }
    Ok(headers)
}

fn classify_transport_error(err: &reqwest::Error) -> PipelineError {
    if err.is_builder() {
        return PipelineError::InvalidRequest(err.to_string());
    }

    PipelineError::ServiceUnreachable {
        reason: err.to_string(),
        timed_out: err.is_timeout(),
    }
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }

    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
