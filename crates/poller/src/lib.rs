//! Core domain for the NextLead polling trigger.
//!
//! This crate decides, for one configured event type, which freshly fetched
//! CRM events are new and which were already delivered, while bounding the
//! memory spent remembering them. Infrastructure crates implement the port
//! traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; `crm-api` and `state-store` define *how* to
//! supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`TriggerId`, `EntityId`, `PollCycleId`) |
//! | [`types`] | Dedup keys and `Timestamp` |
//! | [`event`] | `EventType` catalogue: endpoints and dedup policies |
//! | [`state`] | Persisted `PollState` and bounded `SeenKeys` |
//! | [`poll`] | `classify` and `Poller` |
//! | [`runner`] | `TriggerRunner`: load, poll, persist |
//! | [`ports`] | `CrmClient` and `PollStateStore` traits |
//! | [`errors`] | `PollError`, `TriggerError`, `RetryPolicy` |

pub mod errors;
pub mod event;
pub mod identifiers;
pub mod poll;
pub mod ports;
pub mod runner;
pub mod state;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{PollError, RetryPolicy, TriggerError};
pub use event::{DedupNamespace, DedupPolicy, EventType, UnknownEventType};
pub use identifiers::{EntityId, PollCycleId, TriggerId};
pub use poll::{classify, PollCycle, PollOutcome, Poller};
pub use ports::{CrmApiError, CrmClient, CrmRequest, HttpMethod, PollStateStore, StateStoreError};
pub use runner::TriggerRunner;
pub use state::{PollState, ProcessedIds, SeenKeys, SEEN_KEY_CAPACITY};
pub use types::{DedupKey, ListMembership, Timestamp};
