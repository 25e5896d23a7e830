//! Port traits implemented by infrastructure crates.
//!
//! The domain never performs I/O itself. `crm-api` implements [`CrmClient`]
//! over HTTP; `state-store` implements [`PollStateStore`] on disk and in memory.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PollState, TriggerId};

// ---------------------------------------------------------------------------
// CRM client
// ---------------------------------------------------------------------------

/// HTTP verb of a [`CrmRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// One request against the CRM, relative to the configured domain.
///
/// Credentials are not part of the request: the [`CrmClient`] implementation
/// owns them and attaches the bearer token itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CrmRequest {
    pub method: HttpMethod,
    /// Absolute path starting with `/`, e.g. `/api/v2/polling/contact/user-created`.
    pub path: String,
    /// JSON body for `POST`/`PUT`.
    pub body: Option<serde_json::Value>,
}

impl CrmRequest {
    /// Builds a body-less `GET` for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }
}

/// Raw failure descriptor returned by a [`CrmClient`].
///
/// Deliberately unclassified: [`crate::PollError::from_api_error`] maps it to
/// the domain taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("CRM request failed (status {status:?}): {message}")]
pub struct CrmApiError {
    /// HTTP status, or `None` when no response was received.
    pub status: Option<u16>,
    /// Response body text or transport error description.
    pub message: String,
    /// Parsed `Retry-After` header, when present.
    pub retry_after: Option<Duration>,
}

impl CrmApiError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

/// Authenticated access to the CRM's REST API.
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Performs `request` and returns the parsed JSON response body.
    ///
    /// Any non-2xx status must be reported as [`CrmApiError`] with the status
    /// set, never as `Ok`.
    async fn request(&self, request: CrmRequest) -> Result<serde_json::Value, CrmApiError>;
}

#[async_trait]
impl<T: CrmClient + ?Sized> CrmClient for std::sync::Arc<T> {
    async fn request(&self, request: CrmRequest) -> Result<serde_json::Value, CrmApiError> {
        (**self).request(request).await
    }
}

// ---------------------------------------------------------------------------
// Poll state store
// ---------------------------------------------------------------------------

/// Failures of a [`PollStateStore`].
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// The underlying medium could not be read or written.
    #[error("I/O error on poll state for trigger '{trigger}': {source}")]
    Io {
        trigger: TriggerId,
        #[source]
        source: std::io::Error,
    },

    /// A stored document exists but is not a valid poll state.
    #[error("Corrupt poll state for trigger '{trigger}': {source}")]
    Corrupt {
        trigger: TriggerId,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable key/value storage of [`PollState`], scoped per trigger instance.
#[async_trait]
pub trait PollStateStore: Send + Sync {
    /// Returns the stored state, or [`PollState::default`] if none exists yet.
    async fn load(&self, trigger: &TriggerId) -> Result<PollState, StateStoreError>;

    /// Replaces the stored state for `trigger`.
    async fn save(&self, trigger: &TriggerId, state: &PollState) -> Result<(), StateStoreError>;
}
