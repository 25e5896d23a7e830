//! Persisted poll state: bounded seen-sets plus the last-poll cursor.
//!
//! The serialised shape is the trigger's storage contract and must stay
//! stable:
//!
//! ```json
//! {
//!   "processedIds": { "contacts": [], "structures": [], "emailLists": [] },
//!   "lastPollTime": "2026-01-01T00:00:00Z"
//! }
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{DedupKey, DedupNamespace, Timestamp};

/// Most recent keys retained per namespace.
pub const SEEN_KEY_CAPACITY: usize = 1000;

// ---------------------------------------------------------------------------

/// Ordered sequence of previously emitted keys, oldest first.
///
/// Order is encounter order, not any domain timestamp. The sequence may
/// temporarily exceed [`SEEN_KEY_CAPACITY`] while a cycle is recording keys;
/// [`SeenKeys::enforce_capacity`] restores the bound before the state leaves
/// the cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenKeys(VecDeque<String>);

impl SeenKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` has been recorded.
    pub fn contains(&self, key: &DedupKey) -> bool {
        let encoded = key.encode();
        self.0.iter().any(|k| *k == encoded)
    }

    /// Appends `key` as the most recent entry.
    pub fn record(&mut self, key: &DedupKey) {
        self.0.push_back(key.encode());
    }

    /// Drops the oldest entries until at most `capacity` remain.
    ///
    /// Returns the number of entries evicted.
    pub fn truncate_oldest(&mut self, capacity: usize) -> usize {
        let excess = self.0.len().saturating_sub(capacity);
        self.0.drain(..excess);
        excess
    }

    /// Applies the standard [`SEEN_KEY_CAPACITY`] bound.
    pub fn enforce_capacity(&mut self) -> usize {
        self.truncate_oldest(SEEN_KEY_CAPACITY)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the encoded keys, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SeenKeys {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------

/// One [`SeenKeys`] per deduplicating namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessedIds {
    pub contacts: SeenKeys,
    pub structures: SeenKeys,
    pub email_lists: SeenKeys,
}

impl ProcessedIds {
    pub fn namespace(&self, ns: DedupNamespace) -> &SeenKeys {
        match ns {
            DedupNamespace::Contacts => &self.contacts,
            DedupNamespace::Structures => &self.structures,
            DedupNamespace::EmailLists => &self.email_lists,
        }
    }

    pub fn namespace_mut(&mut self, ns: DedupNamespace) -> &mut SeenKeys {
        match ns {
            DedupNamespace::Contacts => &mut self.contacts,
            DedupNamespace::Structures => &mut self.structures,
            DedupNamespace::EmailLists => &mut self.email_lists,
        }
    }
}

// ---------------------------------------------------------------------------

/// Everything a trigger instance remembers between cycles.
///
/// Treated as a value: a cycle takes the previous state by reference and
/// returns a new one, which the host persists. [`PollState::default`] is the
/// state of a trigger that has never polled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollState {
    #[serde(default)]
    pub processed_ids: ProcessedIds,

    /// When the last successful cycle finished. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_poll_time: Option<Timestamp>,
}
