//! Catalogue of pollable NextLead events.
//!
//! Each [`EventType`] maps to one fixed polling endpoint and one
//! [`DedupPolicy`]. The policy table is the heart of the trigger:
//!
//! | Event | Policy |
//! |-------|--------|
//! | `contactCreated`, `structureCreated` | seen-set by entity `id` |
//! | `emailAddedToList` | seen-set by (`email`, `listId`) |
//! | everything else | emit every fetched item |

use serde::{Deserialize, Serialize};

/// A pollable event type, named as the trigger configuration names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    ContactCreated,
    ContactUpdated,
    ContactDeleted,
    StructureCreated,
    StructureUpdated,
    StructureDeleted,
    EmailAddedToList,
    EmailRemovedFromList,
}

/// Which seen-set an event type deduplicates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DedupNamespace {
    Contacts,
    Structures,
    EmailLists,
}

/// How fetched items of an event type are filtered before emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Emit every fetched item; state is not touched.
    EmitAll,
    /// Emit items whose `id` is unseen in the namespace.
    ById(DedupNamespace),
    /// Emit items whose (`email`, `listId`) pair is unseen in the namespace.
    ByListMembership(DedupNamespace),
}

impl EventType {
    /// Every event type, in display order.
    pub const ALL: [EventType; 8] = [
        EventType::ContactCreated,
        EventType::ContactUpdated,
        EventType::ContactDeleted,
        EventType::StructureCreated,
        EventType::StructureUpdated,
        EventType::StructureDeleted,
        EventType::EmailAddedToList,
        EventType::EmailRemovedFromList,
    ];

    /// Parses a configuration name such as `"contactCreated"`.
    ///
    /// Returns `None` for names outside the catalogue.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    /// The configuration name, e.g. `"contactCreated"`.
    pub fn name(self) -> &'static str {
        match self {
            EventType::ContactCreated => "contactCreated",
            EventType::ContactUpdated => "contactUpdated",
            EventType::ContactDeleted => "contactDeleted",
            EventType::StructureCreated => "structureCreated",
            EventType::StructureUpdated => "structureUpdated",
            EventType::StructureDeleted => "structureDeleted",
            EventType::EmailAddedToList => "emailAddedToList",
            EventType::EmailRemovedFromList => "emailRemovedFromList",
        }
    }

    /// Human-readable description shown in listings.
    pub fn description(self) -> &'static str {
        match self {
            EventType::ContactCreated => "Trigger when a new contact is created",
            EventType::ContactUpdated => "Trigger when a contact is updated",
            EventType::ContactDeleted => "Trigger when a contact is deleted",
            EventType::StructureCreated => "Trigger when a new structure is created",
            EventType::StructureUpdated => "Trigger when a structure is updated",
            EventType::StructureDeleted => "Trigger when a structure is deleted",
            EventType::EmailAddedToList => "Trigger when an email is added to a list",
            EventType::EmailRemovedFromList => "Trigger when an email is removed from a list",
        }
    }

    /// Polling endpoint path, relative to the configured domain.
    pub fn endpoint(self) -> &'static str {
        match self {
            EventType::ContactCreated => "/api/v2/polling/contact/user-created",
            EventType::ContactUpdated => "/api/v2/polling/contact/user-edited",
            EventType::ContactDeleted => "/api/v2/polling/contact/user-deleted",
            EventType::StructureCreated => "/api/v2/polling/structures/structure-created",
            EventType::StructureUpdated => "/api/v2/polling/structures/structure-edited",
            EventType::StructureDeleted => "/api/v2/polling/structures/structure-deleted",
            EventType::EmailAddedToList => "/api/v2/polling/email/added-to-list",
            EventType::EmailRemovedFromList => "/api/v2/polling/email/removed-from-list",
        }
    }

    pub fn dedup_policy(self) -> DedupPolicy {
        match self {
            EventType::ContactCreated => DedupPolicy::ById(DedupNamespace::Contacts),
            EventType::StructureCreated => DedupPolicy::ById(DedupNamespace::Structures),
            EventType::EmailAddedToList => {
                DedupPolicy::ByListMembership(DedupNamespace::EmailLists)
            }
            EventType::ContactUpdated
            | EventType::ContactDeleted
            | EventType::StructureUpdated
            | EventType::StructureDeleted
            | EventType::EmailRemovedFromList => DedupPolicy::EmitAll,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownEventType(s.to_owned()))
    }
}

/// Returned by [`EventType::from_str`] for names outside the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type '{0}'")]
pub struct UnknownEventType(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_name() {
        for event in EventType::ALL {
            assert_eq!(EventType::from_name(event.name()), Some(event));
        }
        assert_eq!(EventType::from_name("dealWon"), None);
    }

    #[test]
    fn serde_names_match_configuration_names() {
        let json = serde_json::to_string(&EventType::EmailRemovedFromList).unwrap();
        assert_eq!(json, "\"emailRemovedFromList\"");
    }

    #[test]
    fn only_creation_and_list_additions_deduplicate() {
        let deduped: Vec<_> = EventType::ALL
            .into_iter()
            .filter(|e| e.dedup_policy() != DedupPolicy::EmitAll)
            .collect();
        assert_eq!(
            deduped,
            vec![
                EventType::ContactCreated,
                EventType::StructureCreated,
                EventType::EmailAddedToList
            ]
        );
    }

    #[test]
    fn endpoints_are_polling_paths() {
        for event in EventType::ALL {
            assert!(event.endpoint().starts_with("/api/v2/polling/"), "{event}");
        }
    }
}
