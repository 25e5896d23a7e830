//! One poll cycle: fetch a snapshot, keep what is new, return the next state.
//!
//! [`classify`] is the pure half and holds every deduplication rule.
//! [`Poller`] adds the single fetch through a [`CrmClient`].
//!
//! ## Invariants
//!
//! - A failed fetch yields `Err` and no state; the caller's state is untouched.
//! - After a successful cycle every seen-set holds at most
//!   [`crate::SEEN_KEY_CAPACITY`] keys.
//! - Replaying a snapshot against the state it produced yields
//!   [`PollOutcome::NothingNew`] for deduplicating event types.

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    CrmClient, CrmRequest, DedupKey, DedupPolicy, EntityId, EventType, ListMembership, PollError,
    PollState, Timestamp,
};

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// What a cycle hands to the host for emission.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Nothing to emit; the host should treat the run as a no-op.
    NothingNew,
    /// New events, in snapshot order, passed through unmodified. Never empty.
    Items(Vec<Value>),
}

impl PollOutcome {
    fn from_items(items: Vec<Value>) -> Self {
        if items.is_empty() {
            PollOutcome::NothingNew
        } else {
            PollOutcome::Items(items)
        }
    }

    /// Emitted items; empty for [`PollOutcome::NothingNew`].
    pub fn items(&self) -> &[Value] {
        match self {
            PollOutcome::NothingNew => &[],
            PollOutcome::Items(items) => items,
        }
    }

    pub fn into_items(self) -> Vec<Value> {
        match self {
            PollOutcome::NothingNew => Vec::new(),
            PollOutcome::Items(items) => items,
        }
    }

    pub fn is_nothing_new(&self) -> bool {
        matches!(self, PollOutcome::NothingNew)
    }
}

/// Result of a successful cycle: what to emit, and the state to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct PollCycle {
    pub outcome: PollOutcome,
    pub state: PollState,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Applies the dedup policy of `event` to a fetched response body.
///
/// `snapshot` is the raw body; anything other than a JSON array counts as
/// zero items. `now` becomes the new `lastPollTime`.
pub fn classify(
    event: EventType,
    snapshot: Value,
    previous: &PollState,
    now: Timestamp,
) -> PollCycle {
    let items = match snapshot {
        Value::Array(items) => items,
        other => {
            warn!(
                event = %event,
                kind = json_kind(&other),
                "Polling response is not an array; treating as empty"
            );
            Vec::new()
        }
    };
    let fetched = items.len();

    let mut state = previous.clone();
    state.last_poll_time = Some(now);

    let emitted = match event.dedup_policy() {
        DedupPolicy::EmitAll => items,
        DedupPolicy::ById(ns) | DedupPolicy::ByListMembership(ns) => {
            let seen = state.processed_ids.namespace_mut(ns);
            let mut fresh = Vec::new();
            for item in items {
                let Some(key) = dedup_key(event.dedup_policy(), &item) else {
                    warn!(event = %event, "Skipping polled item without a usable dedup key");
                    continue;
                };
                if seen.contains(&key) {
                    debug!(event = %event, key = %key, "Already delivered");
                    continue;
                }
                seen.record(&key);
                fresh.push(item);
            }
            let evicted = seen.enforce_capacity();
            if evicted > 0 {
                debug!(event = %event, evicted, "Evicted oldest seen keys");
            }
            fresh
        }
    };

    debug!(event = %event, fetched, emitted = emitted.len(), "Classified snapshot");
    PollCycle {
        outcome: PollOutcome::from_items(emitted),
        state,
    }
}

fn dedup_key(policy: DedupPolicy, item: &Value) -> Option<DedupKey> {
    match policy {
        DedupPolicy::EmitAll => None,
        DedupPolicy::ById(_) => scalar_field(item, "id")
            .and_then(EntityId::new)
            .map(DedupKey::Entity),
        DedupPolicy::ByListMembership(_) => {
            let email = scalar_field(item, "email")?;
            let list_id = scalar_field(item, "listId")?;
            ListMembership::new(email, list_id).map(DedupKey::ListMembership)
        }
    }
}

/// Reads a string or numeric field as a string. Numbers are rendered in
/// decimal so `7` and `"7"` produce the same key.
fn scalar_field(item: &Value, field: &str) -> Option<String> {
    match item.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Runs poll cycles against a [`CrmClient`].
///
/// Holds no state of its own; callers pass the previous [`PollState`] in and
/// persist the returned one.
#[derive(Debug, Clone)]
pub struct Poller<C> {
    client: C,
}

impl<C: CrmClient> Poller<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs one cycle for `event`: exactly one `GET` to the event's endpoint.
    ///
    /// # Errors
    ///
    /// Returns the classified [`PollError`] if the fetch fails. No state is
    /// produced in that case.
    pub async fn poll(&self, event: EventType, state: &PollState) -> Result<PollCycle, PollError> {
        debug!(event = %event, endpoint = event.endpoint(), "Fetching polling snapshot");
        let snapshot = self
            .client
            .request(CrmRequest::get(event.endpoint()))
            .await
            .map_err(PollError::from_api_error)?;
        Ok(classify(event, snapshot, state, Timestamp::now()))
    }

    /// Runs one cycle for an event named as in trigger configuration.
    ///
    /// Unknown names fetch nothing and emit nothing, but still advance
    /// `lastPollTime`.
    pub async fn poll_named(&self, name: &str, state: &PollState) -> Result<PollCycle, PollError> {
        match EventType::from_name(name) {
            Some(event) => self.poll(event, state).await,
            None => {
                warn!(event = name, "Unknown event type; nothing fetched");
                let mut state = state.clone();
                state.last_poll_time = Some(Timestamp::now());
                Ok(PollCycle {
                    outcome: PollOutcome::NothingNew,
                    state,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::{CrmApiError, SeenKeys, SEEN_KEY_CAPACITY};

    /// Replays one canned response and records requested paths.
    struct ScriptedClient {
        response: Result<Value, CrmApiError>,
        paths: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn ok(body: Value) -> Self {
            Self {
                response: Ok(body),
                paths: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                response: Err(CrmApiError::new(Some(status), "boom")),
                paths: Mutex::new(Vec::new()),
            }
        }

        fn paths(&self) -> Vec<String> {
            self.paths.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CrmClient for ScriptedClient {
        async fn request(&self, request: CrmRequest) -> Result<Value, CrmApiError> {
            self.paths.lock().unwrap().push(request.path);
            self.response.clone()
        }
    }

    fn at(hour: u32) -> Timestamp {
        Timestamp::from_utc(chrono::Utc.with_ymd_and_hms(2026, 5, 1, hour, 0, 0).unwrap())
    }

    fn contacts(state: &PollState) -> Vec<&str> {
        state.processed_ids.contacts.iter().collect()
    }

    #[test]
    fn created_events_are_idempotent_across_replays() {
        let snapshot = json!([{ "id": "a" }, { "id": "b" }]);

        let first =
            classify(EventType::ContactCreated, snapshot.clone(), &PollState::default(), at(1));
        assert_eq!(first.outcome, PollOutcome::Items(vec![json!({"id": "a"}), json!({"id": "b"})]));
        assert_eq!(contacts(&first.state), vec!["a", "b"]);

        let second = classify(EventType::ContactCreated, snapshot, &first.state, at(2));
        assert_eq!(second.outcome, PollOutcome::NothingNew);
        assert_eq!(contacts(&second.state), vec!["a", "b"]);
        assert_eq!(second.state.last_poll_time, Some(at(2)));
    }

    #[test]
    fn only_unseen_ids_are_emitted() {
        let mut state = PollState::default();
        state.processed_ids.contacts = ["a"].into_iter().collect();

        let cycle = classify(
            EventType::ContactCreated,
            json!([{ "id": "a" }, { "id": "b" }]),
            &state,
            at(1),
        );
        assert_eq!(cycle.outcome.items(), &[json!({"id": "b"})]);
        assert_eq!(contacts(&cycle.state), vec!["a", "b"]);
    }

    #[test]
    fn retention_is_bounded_and_evicts_oldest() {
        let mut state = PollState::default();
        state.processed_ids.structures =
            (0..SEEN_KEY_CAPACITY).map(|i| format!("old-{i}")).collect();

        let snapshot = Value::Array((0..5).map(|i| json!({ "id": format!("new-{i}") })).collect());
        let cycle = classify(EventType::StructureCreated, snapshot, &state, at(1));

        let seen: Vec<&str> = cycle.state.processed_ids.structures.iter().collect();
        assert_eq!(seen.len(), SEEN_KEY_CAPACITY);
        assert_eq!(seen[0], "old-5");
        assert!(!seen.contains(&"old-4"));
        assert_eq!(&seen[SEEN_KEY_CAPACITY - 5..], &["new-0", "new-1", "new-2", "new-3", "new-4"]);
        assert_eq!(cycle.outcome.items().len(), 5);
    }

    #[test]
    fn oversized_snapshot_emits_everything_but_keeps_latest_keys() {
        let snapshot = Value::Array((0..1200).map(|i| json!({ "id": i })).collect());
        let cycle = classify(EventType::ContactCreated, snapshot, &PollState::default(), at(1));

        assert_eq!(cycle.outcome.items().len(), 1200);
        assert_eq!(cycle.state.processed_ids.contacts.len(), SEEN_KEY_CAPACITY);
        assert_eq!(cycle.state.processed_ids.contacts.iter().next(), Some("200"));
    }

    #[test]
    fn updates_and_deletes_are_never_deduplicated() {
        let mut state = PollState::default();
        state.processed_ids.contacts = ["x"].into_iter().collect();

        for event in [EventType::ContactUpdated, EventType::ContactDeleted] {
            let cycle = classify(event, json!([{ "id": "x" }]), &state, at(1));
            assert_eq!(cycle.outcome.items(), &[json!({"id": "x"})], "{event}");
            assert_eq!(cycle.state.processed_ids, state.processed_ids, "{event}");

            let again = classify(event, json!([{ "id": "x" }]), &cycle.state, at(2));
            assert_eq!(again.outcome.items(), &[json!({"id": "x"})], "{event}");
        }
    }

    #[test]
    fn list_additions_dedupe_on_email_and_list_pair() {
        let first = classify(
            EventType::EmailAddedToList,
            json!([{ "email": "a@x.com", "listId": "L1" }]),
            &PollState::default(),
            at(1),
        );
        assert_eq!(first.outcome.items().len(), 1);

        let repeat = classify(
            EventType::EmailAddedToList,
            json!([{ "email": "a@x.com", "listId": "L1" }]),
            &first.state,
            at(2),
        );
        assert!(repeat.outcome.is_nothing_new());

        let other_list = classify(
            EventType::EmailAddedToList,
            json!([{ "email": "a@x.com", "listId": "L2" }]),
            &repeat.state,
            at(3),
        );
        assert_eq!(other_list.outcome.items(), &[json!({"email": "a@x.com", "listId": "L2"})]);
        assert_eq!(other_list.state.processed_ids.email_lists.len(), 2);
    }

    #[test]
    fn list_removals_emit_everything() {
        let body = json!([{ "email": "a@x.com", "listId": "L1" }]);
        let first =
            classify(EventType::EmailRemovedFromList, body.clone(), &PollState::default(), at(1));
        let second = classify(EventType::EmailRemovedFromList, body, &first.state, at(2));
        assert_eq!(second.outcome.items().len(), 1);
        assert!(second.state.processed_ids.email_lists.is_empty());
    }

    #[test]
    fn duplicates_within_one_snapshot_are_emitted_once() {
        let cycle = classify(
            EventType::ContactCreated,
            json!([{ "id": "a", "v": 1 }, { "id": "a", "v": 2 }]),
            &PollState::default(),
            at(1),
        );
        assert_eq!(cycle.outcome.items(), &[json!({"id": "a", "v": 1})]);
    }

    #[test]
    fn items_without_keys_are_skipped_for_dedup_types() {
        let cycle = classify(
            EventType::ContactCreated,
            json!([{ "name": "no id" }, { "id": "" }, { "id": null }, { "id": "ok" }]),
            &PollState::default(),
            at(1),
        );
        assert_eq!(cycle.outcome.items(), &[json!({"id": "ok"})]);

        let lists = classify(
            EventType::EmailAddedToList,
            json!([{ "email": "a@x.com" }]),
            &PollState::default(),
            at(1),
        );
        assert!(lists.outcome.is_nothing_new());
    }

    #[test]
    fn numeric_and_string_ids_share_a_key() {
        let mut state = PollState::default();
        state.processed_ids.contacts = SeenKeys::from_iter(["7"]);
        let cycle = classify(EventType::ContactCreated, json!([{ "id": 7 }]), &state, at(1));
        assert!(cycle.outcome.is_nothing_new());
    }

    #[test]
    fn non_array_body_counts_as_empty() {
        let cycle = classify(
            EventType::ContactUpdated,
            json!({ "message": "no events" }),
            &PollState::default(),
            at(4),
        );
        assert!(cycle.outcome.is_nothing_new());
        assert_eq!(cycle.state.last_poll_time, Some(at(4)));
    }

    #[tokio::test]
    async fn poll_fetches_the_event_endpoint_once() {
        let poller = Poller::new(ScriptedClient::ok(json!([{ "id": "s1" }])));
        let cycle = poller
            .poll(EventType::StructureCreated, &PollState::default())
            .await
            .unwrap();

        assert_eq!(cycle.outcome.items(), &[json!({"id": "s1"})]);
        assert!(cycle.state.last_poll_time.is_some());
        assert_eq!(
            poller.client().paths(),
            vec!["/api/v2/polling/structures/structure-created".to_owned()]
        );
    }

    #[tokio::test]
    async fn failed_fetch_is_classified_and_produces_no_state() {
        let mut state = PollState::default();
        state.processed_ids.contacts = ["a"].into_iter().collect();
        state.last_poll_time = Some(at(1));
        let before = state.clone();

        let poller = Poller::new(ScriptedClient::failing(500));
        let err = poller.poll(EventType::ContactCreated, &state).await.unwrap_err();

        assert_eq!(err, PollError::Server { status: 500 });
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn unknown_event_name_fetches_nothing() {
        let poller = Poller::new(ScriptedClient::ok(json!([{ "id": "a" }])));
        let cycle = poller.poll_named("dealWon", &PollState::default()).await.unwrap();

        assert!(cycle.outcome.is_nothing_new());
        assert!(cycle.state.last_poll_time.is_some());
        assert!(poller.client().paths().is_empty());
    }

    #[tokio::test]
    async fn known_event_name_polls_normally() {
        let poller = Poller::new(ScriptedClient::ok(json!([{ "id": "a" }])));
        let cycle = poller.poll_named("contactDeleted", &PollState::default()).await.unwrap();
        assert_eq!(cycle.outcome.items().len(), 1);
        assert_eq!(
            poller.client().paths(),
            vec!["/api/v2/polling/contact/user-deleted".to_owned()]
        );
    }
}
