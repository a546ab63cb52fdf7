//! Authenticated Discord REST client.

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, Method, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use super::body::{EncodedBody, FileUpload, Payload, into_form};
use super::error::{RestError, RestResult};
use crate::domain::entities::BotToken;

/// Versioned REST base URL.
pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10/";

/// Header carrying the percent-encoded audit-log reason.
pub const AUDIT_LOG_REASON_HEADER: &str = "X-Audit-Log-Reason";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn user_agent() -> String {
    format!(
        "DiscordBot ({}, {})",
        env!("CARGO_PKG_REPOSITORY"),
        env!("CARGO_PKG_VERSION")
    )
}

/// Result of a successful request.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// A 2xx response with a JSON body.
    Content(Value),
    /// A 204, or a 2xx with an empty body.
    NoContent,
}

impl ApiResponse {
    /// Deserializes the body.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Decode`] on `NoContent` or a shape mismatch.
    pub fn json<T: DeserializeOwned>(self) -> RestResult<T> {
        match self {
            Self::Content(value) => serde_json::from_value(value).map_err(RestError::from),
            Self::NoContent => Err(RestError::decode("expected a response body, got 204")),
        }
    }

    #[must_use]
    pub const fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }
}

/// Maps a status and body to a response or an API error.
///
/// # Errors
///
/// Returns [`RestError::Api`] for non-2xx statuses and
/// [`RestError::Decode`] for a 2xx body that is not JSON.
pub fn decode_response(status: StatusCode, body: &[u8]) -> RestResult<ApiResponse> {
    if status == StatusCode::NO_CONTENT {
        return Ok(ApiResponse::NoContent);
    }

    if !status.is_success() {
        return Err(RestError::from_response(status.as_u16(), body));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ApiResponse::NoContent);
    }

    serde_json::from_slice(body)
        .map(ApiResponse::Content)
        .map_err(|e| RestError::decode(format!("invalid JSON in {status} response: {e}")))
}

/// Issues authenticated calls against the REST API.
///
/// Requests are independent; the only shared state is the token, which can be
/// swapped at any time.
pub struct RequestClient {
    http: Client,
    base_url: Url,
    token: RwLock<Option<BotToken>>,
}

impl RequestClient {
    /// Creates a client against the production API.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(token: Option<BotToken>) -> RestResult<Self> {
        Self::with_base_url(DISCORD_API_BASE, token)
    }

    /// Creates a client against a custom base URL.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or HTTP client creation fails.
    pub fn with_base_url(base_url: &str, token: Option<BotToken>) -> RestResult<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|e| RestError::encode(format!("invalid base URL: {e}")))?;

        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(RestError::from)?;

        Ok(Self {
            http,
            base_url,
            token: RwLock::new(token),
        })
    }

    /// Replaces the token used for subsequent requests.
    pub fn set_token(&self, token: Option<BotToken>) {
        *self.token.write() = token;
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> RestResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| RestError::encode(format!("invalid path {path}: {e}")))
    }

    /// Sends one request.
    ///
    /// `body` may carry a `reason` key, which is sent as the audit-log header
    /// instead. With `files`, the body goes out as multipart.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Api`] for non-2xx responses, [`RestError::Transport`]
    /// when no response arrived, and [`RestError::MissingToken`] when no token
    /// is set.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        files: Vec<FileUpload>,
    ) -> RestResult<ApiResponse> {
        let authorization = self
            .token
            .read()
            .as_ref()
            .map(BotToken::authorization)
            .ok_or(RestError::MissingToken)?;

        self.send(method, path, body, files, Some(authorization)).await
    }

    /// Sends a request without the authorization header.
    ///
    /// # Errors
    ///
    /// Same as [`RequestClient::request`], minus the token check.
    pub async fn request_unauthenticated(
        &self,
        method: Method,
        path: &str,
    ) -> RestResult<ApiResponse> {
        self.send(method, path, None, Vec::new(), None).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        files: Vec<FileUpload>,
        authorization: Option<String>,
    ) -> RestResult<ApiResponse> {
        let url = self.url(path)?;
        let encoded = EncodedBody::encode(body, files)?;

        debug!(%method, path, multipart = matches!(encoded.payload, Payload::Multipart { .. }), "REST request");

        let mut request = self.http.request(method.clone(), url);
        if let Some(authorization) = authorization {
            request = request.header(header::AUTHORIZATION, authorization);
        }
        if let Some(reason) = encoded.reason_header() {
            request = request.header(AUDIT_LOG_REASON_HEADER, reason);
        }

        request = match encoded.payload {
            Payload::Empty => request,
            Payload::Json(value) => request.json(&value),
            Payload::Multipart {
                payload_json,
                files,
            } => request.multipart(into_form(&payload_json, files)?),
        };

        let response = request.send().await.map_err(|e| {
            warn!(%method, path, error = %e, "REST request failed");
            RestError::from(e)
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(RestError::from)?;
        trace!(%method, path, %status, len = bytes.len(), "REST response");

        decode_response(status, &bytes).inspect_err(|e| {
            warn!(%method, path, %status, error = %e, "REST request rejected");
        })
    }

    /// GET and deserialize.
    ///
    /// # Errors
    /// See [`RequestClient::request`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> RestResult<T> {
        self.request(Method::GET, path, None, Vec::new())
            .await?
            .json()
    }

    /// POST a JSON body and deserialize the response.
    ///
    /// # Errors
    /// See [`RequestClient::request`].
    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> RestResult<T> {
        self.request(Method::POST, path, Some(body), Vec::new())
            .await?
            .json()
    }

    /// PATCH a JSON body and deserialize the response.
    ///
    /// # Errors
    /// See [`RequestClient::request`].
    pub async fn patch<T: DeserializeOwned>(&self, path: &str, body: Value) -> RestResult<T> {
        self.request(Method::PATCH, path, Some(body), Vec::new())
            .await?
            .json()
    }

    /// PUT a JSON body and deserialize the response.
    ///
    /// # Errors
    /// See [`RequestClient::request`].
    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: Value) -> RestResult<T> {
        self.request(Method::PUT, path, Some(body), Vec::new())
            .await?
            .json()
    }

    /// Sends a request whose answer carries no body worth decoding.
    ///
    /// # Errors
    /// See [`RequestClient::request`].
    pub async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> RestResult<()> {
        self.request(method, path, body, Vec::new()).await.map(|_| ())
    }
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &*self.token.read())
            .finish_non_exhaustive()
    }
}
