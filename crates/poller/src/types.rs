//! Shared value types for the trigger domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (e.g. a list-membership key always has
//! both halves) and participate in deduplication decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EntityId;

// ---------------------------------------------------------------------------
// Dedup keys
// ---------------------------------------------------------------------------

/// The pair that identifies one "email is a member of list" fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMembership {
    /// Email address of the contact.
    pub email: String,
    /// Identifier of the list the email was added to.
    pub list_id: String,
}

impl ListMembership {
    /// Creates a [`ListMembership`], returning `None` if either half is empty.
    pub fn new(email: impl Into<String>, list_id: impl Into<String>) -> Option<Self> {
        let email = email.into();
        let list_id = list_id.into();
        if email.is_empty() || list_id.is_empty() {
            None
        } else {
            Some(Self { email, list_id })
        }
    }
}

// ---------------------------------------------------------------------------

/// Key under which an emitted event is remembered in a seen-set.
///
/// Keys are persisted as strings (see [`DedupKey::encode`]). Entity keys
/// encode to the bare id. List-membership keys encode to a JSON two-element
/// array, which escapes both halves, so `("a_b", "c")` and `("a", "b_c")`
/// never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// Primary key of a created entity.
    Entity(EntityId),
    /// Email/list pair of a list-membership event.
    ListMembership(ListMembership),
}

impl DedupKey {
    /// Returns the persisted string form of this key.
    pub fn encode(&self) -> String {
        match self {
            DedupKey::Entity(id) => id.as_str().to_owned(),
            DedupKey::ListMembership(m) => {
                serde_json::Value::Array(vec![
                    serde_json::Value::String(m.email.clone()),
                    serde_json::Value::String(m.list_id.clone()),
                ])
                .to_string()
            }
        }
    }
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DedupKey::Entity(id) => write!(f, "{id}"),
            DedupKey::ListMembership(m) => write!(f, "{} in {}", m.email, m.list_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly. Serialises as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
