//! HTTP client for the Campus REST API.
//!
//! This module wraps the endpoints the history screen consumes:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | [`ApiClient::login`] | `POST /auth/login` |
//! | [`HistoryBackend::fetch_history`] | `GET /files/{fileId}/history` |
//! | [`HistoryBackend::fetch_base_content`] | `GET /files/{fileId}/content` |
//! | [`HistoryBackend::fetch_change_content`] | `GET /file-changes/{changeId}/content` |
//!
//! Every request carries `Authorization: Bearer <token>` when a session is
//! attached. Requests are never retried; failures surface to the caller as
//! [`ApiError`] values. A 401 maps to [`ApiError::Unauthorized`], which
//! callers treat as the end of the session.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use campus_client::api::{ApiClient, HistoryBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = ApiClient::new("https://api.campus.example", Duration::from_secs(30), None)?;
//!     client.login("ana@campus.example", "secret").await?;
//!
//!     let raw = client.fetch_history("file-1").await?;
//!     println!("{} change records", raw.len());
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use campus_history::{extract_records, ContentPayload, ContentSource};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::session::{Session, UserProfile};

/// Keys of a JSON content envelope that may hold the payload, in order.
const ENVELOPE_CONTENT_KEYS: &[&str] = &["content", "content_after", "data"];

/// Keys of a JSON content envelope that may hold the MIME type, in order.
const ENVELOPE_MIME_KEYS: &[&str] = &["mime_type", "content_type", "mimeType", "contentType"];

/// Errors that can occur when talking to the Campus API.
///
/// These errors let callers tell apart a dead session (sign in again), a
/// missing resource (show "content unavailable") and transport problems
/// (offer a manual refresh).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the bearer token or the credentials (401).
    ///
    /// The session should be treated as invalid.
    #[error("unauthorized: session is invalid or expired")]
    Unauthorized,

    /// The backend has nothing at the requested location (404), or
    /// returned an empty payload.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request timed out.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The backend is unreachable.
    #[error("API unavailable: {0}")]
    Unavailable(String),

    /// The backend returned an unexpected error status.
    #[error("server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// The response body could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Client configuration error, such as an unusable base URL.
    #[error("client configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    /// Returns true if the error means the session is no longer valid.
    #[must_use]
    pub fn is_session_invalidating(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns true if the requested resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// The backend operations the history view depends on.
///
/// Implemented by [`ApiClient`]; tests substitute in-memory fakes.
pub trait HistoryBackend {
    /// Fetches the raw change records of a file.
    fn fetch_history(
        &self,
        file_id: &str,
    ) -> impl Future<Output = Result<Vec<Value>, ApiError>> + Send;

    /// Fetches the base content of a file (its first version).
    fn fetch_base_content(
        &self,
        file_id: &str,
    ) -> impl Future<Output = Result<ContentPayload, ApiError>> + Send;

    /// Fetches the content stored with a later change.
    fn fetch_change_content(
        &self,
        change_id: &str,
    ) -> impl Future<Output = Result<ContentPayload, ApiError>> + Send;
}

/// Login request body.
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Login response body.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(alias = "access_token", alias = "accessToken")]
    token: String,

    #[serde(default)]
    user: Option<UserProfile>,
}

/// Client for the Campus REST API.
///
/// Wraps a pooled `reqwest::Client`; cheap to share by reference.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: Url,
    timeout: Duration,
    session: Option<Session>,
}

impl ApiClient {
    /// Creates a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Configuration`] if the URL cannot serve as a base
    /// or the HTTP client cannot be created.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Option<Session>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::Configuration(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Configuration(format!(
                "base URL '{base_url}' cannot have path segments"
            )));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| ApiError::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url,
            timeout,
            session,
        })
    }

    /// Creates a client from the loaded configuration.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::new`].
    pub fn from_config(config: &Config, session: Option<Session>) -> Result<Self, ApiError> {
        Self::new(&config.api_url, config.request_timeout, session)
    }

    /// The attached session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Signs in and attaches the resulting session to this client.
    ///
    /// The caller decides whether to persist the returned session.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Unauthorized`] - the credentials were rejected
    /// - [`ApiError::InvalidResponse`] - the response carried no usable token
    /// - transport errors as for any request
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, ApiError> {
        let url = self.endpoint(&["auth", "login"])?;
        debug!(url = %url, "Signing in");

        let request = self
            .http_client
            .post(url)
            .json(&LoginRequest { email, password });
        let response = self.send(request).await?;

        let body: LoginResponse = response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("failed to parse login response: {e}"))
        })?;
        if body.token.trim().is_empty() {
            return Err(ApiError::InvalidResponse(
                "login response has an empty token".to_string(),
            ));
        }

        let session = Session::new(body.token, body.user);
        info!(
            user_id = session.user().and_then(|u| u.id.as_deref()).unwrap_or("unknown"),
            "Signed in"
        );
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Fetches content from the endpoint a [`ContentSource`] designates.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the backend has no content there.
    pub async fn fetch_content(&self, source: &ContentSource) -> Result<ContentPayload, ApiError> {
        let url = self.endpoint(&source.path_segments())?;
        debug!(url = %url, source = %source, "Fetching content");

        let response = self.send(self.http_client.get(url)).await?;
        read_content(response, source).await
    }

    /// Builds the URL for a path below the base URL, percent-encoding each
    /// segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ApiError::Configuration(format!("base URL '{}' cannot be extended", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a request with the session's bearer token and maps failures.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = match &self.session {
            Some(session) => request.bearer_auth(session.token()),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout)
            } else if e.is_connect() {
                ApiError::Unavailable(format!("connection failed: {e}"))
            } else {
                ApiError::Unavailable(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => {
                warn!(url = %response.url(), "Request rejected as unauthorized");
                Err(ApiError::Unauthorized)
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(response.url().path().to_string())),
            _ => {
                let url = response.url().clone();
                let message = response.text().await.unwrap_or_default();
                error!(status = %status, url = %url, body = %message, "Unexpected API response");
                Err(ApiError::ServerError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

impl HistoryBackend for ApiClient {
    async fn fetch_history(&self, file_id: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.endpoint(&["files", file_id, "history"])?;
        debug!(url = %url, "Fetching history");

        let response = self.send(self.http_client.get(url)).await?;
        let body: Value = response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("failed to parse history response: {e}"))
        })?;

        let records = extract_records(body).ok_or_else(|| {
            ApiError::InvalidResponse("history response is not a list of changes".to_string())
        })?;

        debug!(file_id, count = records.len(), "Fetched history");
        Ok(records)
    }

    async fn fetch_base_content(&self, file_id: &str) -> Result<ContentPayload, ApiError> {
        self.fetch_content(&ContentSource::Base {
            file_id: file_id.to_string(),
        })
        .await
    }

    async fn fetch_change_content(&self, change_id: &str) -> Result<ContentPayload, ApiError> {
        self.fetch_content(&ContentSource::Change {
            change_id: change_id.to_string(),
        })
        .await
    }
}

/// Reads a content response.
///
/// JSON bodies are treated as an envelope around the payload; anything else
/// is the payload itself, typed by the `Content-Type` header.
async fn read_content(
    response: Response,
    source: &ContentSource,
) -> Result<ContentPayload, ApiError> {
    let header_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let is_json = header_type.as_deref().is_some_and(is_json_mime);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::InvalidResponse(format!("failed to read content body: {e}")))?;

    let payload = if is_json {
        let envelope: Value = serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::InvalidResponse(format!("failed to parse content envelope: {e}"))
        })?;
        unwrap_envelope(envelope)
    } else {
        Some(ContentPayload::new(bytes.to_vec(), header_type))
    };

    match payload {
        Some(payload) if !payload.is_empty() => {
            debug!(source = %source, bytes = payload.len(), "Content fetched");
            Ok(payload)
        }
        _ => Err(ApiError::NotFound(source.to_string())),
    }
}

/// Extracts the payload and MIME hint from a JSON content envelope.
fn unwrap_envelope(envelope: Value) -> Option<ContentPayload> {
    match envelope {
        Value::Object(fields) => {
            let content = ENVELOPE_CONTENT_KEYS
                .iter()
                .filter_map(|key| fields.get(*key))
                .find(|value| !value.is_null())?;
            let content_type = ENVELOPE_MIME_KEYS
                .iter()
                .filter_map(|key| fields.get(*key))
                .find_map(|value| value.as_str().map(str::to_string));

            let bytes = match content {
                Value::String(text) => text.clone().into_bytes(),
                structured => structured.to_string().into_bytes(),
            };
            Some(ContentPayload::new(bytes, content_type))
        }
        Value::String(text) => Some(ContentPayload::new(text.into_bytes(), None)),
        Value::Null => None,
        other => Some(ContentPayload::new(other.to_string().into_bytes(), None)),
    }
}

fn is_json_mime(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}
