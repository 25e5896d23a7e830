//! API credentials for one NextLead organisation.

use serde::Deserialize;
use thiserror::Error;

/// Production API domain, used when none is configured.
pub const DEFAULT_DOMAIN: &str = "https://dashboard.nextlead.app";

/// Rejected credential input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("API key must not be empty")]
    EmptyApiKey,

    #[error("API domain '{0}' must start with http:// or https://")]
    InvalidDomain(String),
}

/// Domain plus API key. Every request is sent to `<domain><path>` with
/// `Authorization: Bearer <api_key>`.
///
/// `Debug` never prints the key. Deserialising goes through
/// [`Credentials::new`], so a stored document gets the same checks as flags.
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawCredentials")]
pub struct Credentials {
    domain: String,
    api_key: String,
}

/// Unvalidated `{ "domain", "apiKey" }` document.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredentials {
    #[serde(default = "default_domain")]
    domain: String,
    api_key: String,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_owned()
}

impl TryFrom<RawCredentials> for Credentials {
    type Error = CredentialsError;

    fn try_from(raw: RawCredentials) -> Result<Self, Self::Error> {
        Credentials::new(raw.domain, raw.api_key)
    }
}

impl Credentials {
    /// Validates and normalises credentials. A trailing `/` on the domain is
    /// dropped so paths can be appended directly.
    pub fn new(
        domain: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, CredentialsError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CredentialsError::EmptyApiKey);
        }

        let domain = domain.into();
        let domain = domain.trim().trim_end_matches('/').to_owned();
        if !(domain.starts_with("http://") || domain.starts_with("https://")) {
            return Err(CredentialsError::InvalidDomain(domain));
        }

        Ok(Self { domain, api_key })
    }

    /// Credentials against [`DEFAULT_DOMAIN`].
    pub fn with_default_domain(api_key: impl Into<String>) -> Result<Self, CredentialsError> {
        Self::new(DEFAULT_DOMAIN, api_key)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("domain", &self.domain)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
