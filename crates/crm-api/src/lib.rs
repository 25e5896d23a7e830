//! NextLead REST API client adapter.
//!
//! Implements the [`poller::CrmClient`] trait over HTTPS using `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL construction, bearer authentication, status
//! capture, `Retry-After` parsing, and response decoding all live here. The
//! [`poller`] crate sees only [`poller::CrmClient`] and classifies the raw
//! [`poller::CrmApiError`] itself.
//!
//! ## Authentication
//!
//! Every request carries `Authorization: Bearer <apiKey>` and is issued
//! against `<domain><path>`. The domain defaults to [`DEFAULT_DOMAIN`]; use
//! `http://localhost:3000` for a local CRM.

pub mod client;
pub mod credentials;

pub use client::{ClientBuildError, NextLeadClient, CREDENTIAL_CHECK_PATH, DEFAULT_TIMEOUT};
pub use credentials::{Credentials, CredentialsError, DEFAULT_DOMAIN};
