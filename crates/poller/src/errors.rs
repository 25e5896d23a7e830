//! Error and retry-policy types for the trigger domain.
//!
//! [`PollError`] is the classified failure of one poll cycle. [`TriggerError`]
//! wraps it together with state-store failures for the [`crate::TriggerRunner`].
//!
//! [`RetryPolicy`] is a hint for the host: the poller itself never retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::{CrmApiError, StateStoreError};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by [`PollError::retry_policy`] so a scheduling host can decide
/// whether to keep polling or stop and surface the failure.
///
/// ## Rules
///
/// - `Retryable` errors: rate limiting, upstream server errors, transport
///   failures, success responses whose body could not be decoded.
/// - `NonRetryable` errors: rejected credentials, unknown organisation,
///   any other client-side rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (derived
    /// from the `Retry-After` response header).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry on the
        /// caller's own schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried without human intervention.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Poll errors
// ---------------------------------------------------------------------------

/// A failed poll cycle, classified by the HTTP status of the fetch.
///
/// A cycle that returns one of these has produced no new state: the caller's
/// seen-sets and `lastPollTime` are exactly as they were before the call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PollError {
    /// HTTP 401: the API key is invalid or expired.
    #[error("Authentication failed. Please check your NextLead API credentials.")]
    Authentication,

    /// HTTP 404: the organisation behind the key or domain does not exist.
    #[error("Organization not found. Please check your domain configuration.")]
    NotFound,

    /// HTTP 429: too many requests.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited {
        /// Back-off requested by the server, if it sent one.
        retry_after: Option<Duration>,
    },

    /// HTTP 5xx: the CRM is failing.
    #[error("NextLead API server error. Please try again later.")]
    Server {
        /// The exact status code returned.
        status: u16,
    },

    /// Anything else: other 4xx codes, transport failures, undecodable bodies.
    #[error("{message}")]
    Api {
        /// Status code, when the failure came from an HTTP response.
        status: Option<u16>,
        /// Upstream message, or a generic fallback when none was available.
        message: String,
    },
}

impl PollError {
    /// Classifies a raw [`CrmApiError`] by status code.
    pub fn from_api_error(err: CrmApiError) -> Self {
        match err.status {
            Some(401) => PollError::Authentication,
            Some(404) => PollError::NotFound,
            Some(429) => PollError::RateLimited {
                retry_after: err.retry_after,
            },
            Some(status) if status >= 500 => PollError::Server { status },
            status => PollError::Api {
                status,
                message: if err.message.trim().is_empty() {
                    "An unexpected error occurred".to_owned()
                } else {
                    err.message
                },
            },
        }
    }

    /// Longer, user-facing explanation of the failure.
    pub fn description(&self) -> &'static str {
        match self {
            PollError::Authentication => "The API key might be invalid or expired.",
            PollError::NotFound => "The organization associated with your API key was not found.",
            PollError::RateLimited { .. } => "Too many requests have been made to the API.",
            PollError::Server { .. } => "The NextLead API is experiencing issues.",
            PollError::Api { .. } => "Please check your input data and try again.",
        }
    }

    /// Whether the host may try again on a later tick.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            PollError::RateLimited { retry_after } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            PollError::Server { .. } => RetryPolicy::Retryable { after: None },
            // No status means the request never got an answer (connect
            // failure, timeout). A 2xx here means the body did not decode,
            // e.g. a proxy's HTML maintenance page. Both are transient.
            PollError::Api {
                status: None | Some(200..=299),
                ..
            } => RetryPolicy::Retryable { after: None },
            PollError::Authentication | PollError::NotFound | PollError::Api { .. } => {
                RetryPolicy::NonRetryable
            }
        }
    }
}

impl From<CrmApiError> for PollError {
    fn from(err: CrmApiError) -> Self {
        PollError::from_api_error(err)
    }
}

// ---------------------------------------------------------------------------
// Runner errors
// ---------------------------------------------------------------------------

/// Errors from one [`crate::TriggerRunner`] cycle.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The poll itself failed; nothing was persisted.
    #[error(transparent)]
    Poll(#[from] PollError),

    /// Loading or saving the poll state failed.
    #[error("Poll state store failure: {0}")]
    Store(#[from] StateStoreError),
}

impl TriggerError {
    /// Retry hint for the host. Store failures are treated as transient.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            TriggerError::Poll(err) => err.retry_policy(),
            TriggerError::Store(_) => RetryPolicy::Retryable { after: None },
        }
    }
}
