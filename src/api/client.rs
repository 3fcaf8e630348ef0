//! Pre-configured HTTP transport for the chat backend.
//!
//! Single point of HTTP access: fixed base address, JSON content type, and a
//! bypass header so tunneling proxies skip their interstitial warning page.
//! Success responses are unwrapped to the body payload; failures carry the
//! server's structured error body when one was received, so callers can
//! pattern-match a domain-level error shape instead of a raw transport error.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:4000";

/// Error payload the backend attaches to non-2xx responses.
///
/// The documented shape is `{"error": "..."}`; anything else is kept verbatim
/// in `raw` so nothing the server said gets lost.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(skip)]
    pub raw: String,
}

impl ErrorBody {
    fn from_text(text: String) -> Self {
        let mut body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        body.raw = text;
        body
    }

    pub fn message(&self) -> &str {
        self.error.as_deref().unwrap_or(&self.raw)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable response arrived: connect failure, timeout, or an
    /// undecodable success body.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered with a non-2xx status and an error payload.
    #[error("server error {}: {}", .status, .body.message())]
    Api { status: StatusCode, body: ErrorBody },
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "ngrok-skip-browser-warning",
            HeaderValue::from_static("true"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(log_transport_error)?;

        unwrap_response(response).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(log_transport_error)?;

        unwrap_response(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn log_transport_error(err: reqwest::Error) -> ApiError {
    tracing::error!(error = %err, "request failed without a response");
    ApiError::Transport(err)
}

/// Unwraps the transport envelope: 2xx yields the deserialized body payload,
/// anything else yields the server's error payload.
async fn unwrap_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();

    if status.is_success() {
        return response.json::<T>().await.map_err(log_transport_error);
    }

    let text = response.text().await.unwrap_or_default();
    let body = ErrorBody::from_text(text);
    tracing::error!(%status, message = body.message(), "chat backend returned an error");
    Err(ApiError::Api { status, body })
}
