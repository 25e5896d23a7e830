//! `reqwest`-backed [`CrmClient`].

use std::time::Duration;

use async_trait::async_trait;
use poller::{CrmApiError, CrmClient, CrmRequest, HttpMethod, PollError};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, Response};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::Credentials;

/// Endpoint used to check that credentials are accepted.
pub const CREDENTIAL_CHECK_PATH: &str = "/api/v2/receive/contact/get-team";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure to construct a [`NextLeadClient`].
#[derive(Debug, Error)]
#[error("Failed to create HTTP client: {0}")]
pub struct ClientBuildError(#[from] reqwest::Error);

/// HTTP client for one NextLead organisation.
#[derive(Debug, Clone)]
pub struct NextLeadClient {
    http: Client,
    credentials: Credentials,
}

impl NextLeadClient {
    /// Creates a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, ClientBuildError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nextlead-trigger/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, credentials })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.credentials.domain(), path)
    }

    /// Checks that the CRM accepts the configured key.
    ///
    /// # Errors
    ///
    /// Returns the classified [`PollError`] on any non-2xx answer or
    /// transport failure.
    pub async fn verify_credentials(&self) -> Result<(), PollError> {
        self.request(CrmRequest::get(CREDENTIAL_CHECK_PATH))
            .await
            .map(|_| ())
            .map_err(PollError::from_api_error)
    }
}

#[async_trait]
impl CrmClient for NextLeadClient {
    async fn request(&self, request: CrmRequest) -> Result<Value, CrmApiError> {
        let url = self.url(&request.path);
        debug!(method = %request.method, url = %url, "NextLead API request");

        let mut builder = self
            .http
            .request(to_reqwest_method(request.method), &url)
            .bearer_auth(self.credentials.api_key());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CrmApiError::new(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        let text = response.text().await.map_err(|e| {
            CrmApiError::new(
                Some(status.as_u16()),
                format!("Failed to read response body: {e}"),
            )
        })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            CrmApiError::new(Some(status.as_u16()), format!("Failed to parse response: {e}"))
        })
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

async fn error_from_response(response: Response) -> CrmApiError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let body = response.text().await.unwrap_or_default();

    debug!(status = status.as_u16(), "NextLead API error response");
    CrmApiError::new(Some(status.as_u16()), error_message(&body, status.as_u16()))
        .with_retry_after(retry_after)
}

/// Prefers a JSON `message` or `error` string, then the raw body text.
fn error_message(body: &str, status: u16) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        for field in ["message", "error"] {
            if let Some(Value::String(s)) = obj.get(field) {
                if !s.is_empty() {
                    return s.clone();
                }
            }
        }
    }
    if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_owned()
    }
}

/// Only the delay-seconds form is honoured; HTTP-date values are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
