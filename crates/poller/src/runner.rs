//! Host-side lifecycle of one trigger instance: load, poll, persist.

use tracing::{info, warn, Instrument};

use crate::{
    CrmClient, EventType, PollCycleId, PollOutcome, PollStateStore, Poller, TriggerError,
    TriggerId,
};

/// Binds a [`Poller`] to a state store and one configured trigger.
///
/// Cycles must be run serially per trigger; the runner takes no locks.
pub struct TriggerRunner<C, S> {
    poller: Poller<C>,
    store: S,
    trigger: TriggerId,
    event: EventType,
}

impl<C: CrmClient, S: PollStateStore> TriggerRunner<C, S> {
    pub fn new(poller: Poller<C>, store: S, trigger: TriggerId, event: EventType) -> Self {
        Self {
            poller,
            store,
            trigger,
            event,
        }
    }

    pub fn trigger(&self) -> &TriggerId {
        &self.trigger
    }

    pub fn event(&self) -> EventType {
        self.event
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one cycle and persists the resulting state.
    ///
    /// The state is saved only after a successful poll, so a failed fetch
    /// leaves the stored seen-sets and `lastPollTime` untouched.
    ///
    /// # Errors
    ///
    /// [`TriggerError::Poll`] when the fetch fails; [`TriggerError::Store`]
    /// when the state cannot be loaded or saved.
    pub async fn run_cycle(&self) -> Result<PollOutcome, TriggerError> {
        let cycle_id = PollCycleId::new_random();
        let span = tracing::info_span!(
            "poll_cycle",
            cycle_id = %cycle_id,
            trigger_id = %self.trigger,
            event = %self.event,
        );

        self.cycle().instrument(span).await
    }

    async fn cycle(&self) -> Result<PollOutcome, TriggerError> {
        let previous = self.store.load(&self.trigger).await?;
        let cycle = match self.poller.poll(self.event, &previous).await {
            Ok(cycle) => cycle,
            Err(err) => {
                warn!(error = %err, retry = ?err.retry_policy(), "Poll cycle failed");
                return Err(err.into());
            }
        };
        self.store.save(&self.trigger, &cycle.state).await?;

        info!(emitted = cycle.outcome.items().len(), "Poll cycle complete");
        Ok(cycle.outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::{CrmApiError, CrmRequest, PollError, PollState, StateStoreError};

    struct FixedClient(Result<Value, CrmApiError>);

    #[async_trait]
    impl CrmClient for FixedClient {
        async fn request(&self, _request: CrmRequest) -> Result<Value, CrmApiError> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct MapStore(Mutex<HashMap<TriggerId, PollState>>);

    #[async_trait]
    impl PollStateStore for MapStore {
        async fn load(&self, trigger: &TriggerId) -> Result<PollState, StateStoreError> {
            Ok(self.0.lock().unwrap().get(trigger).cloned().unwrap_or_default())
        }

        async fn save(
            &self,
            trigger: &TriggerId,
            state: &PollState,
        ) -> Result<(), StateStoreError> {
            self.0.lock().unwrap().insert(trigger.clone(), state.clone());
            Ok(())
        }
    }

    fn trigger() -> TriggerId {
        TriggerId::new("contacts-feed").unwrap()
    }

    #[tokio::test]
    async fn second_cycle_with_same_snapshot_emits_nothing() {
        let runner = TriggerRunner::new(
            Poller::new(FixedClient(Ok(json!([{ "id": "a" }, { "id": "b" }])))),
            MapStore::default(),
            trigger(),
            EventType::ContactCreated,
        );

        let first = runner.run_cycle().await.unwrap();
        assert_eq!(first.items().len(), 2);

        let second = runner.run_cycle().await.unwrap();
        assert!(second.is_nothing_new());

        let stored = runner.store().load(&trigger()).await.unwrap();
        assert_eq!(stored.processed_ids.contacts.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failed_cycle_does_not_persist() {
        let store = MapStore::default();
        let mut seeded = PollState::default();
        seeded.processed_ids.contacts = ["a"].into_iter().collect();
        store.save(&trigger(), &seeded).await.unwrap();

        let runner = TriggerRunner::new(
            Poller::new(FixedClient(Err(CrmApiError::new(Some(401), "bad key")))),
            store,
            trigger(),
            EventType::ContactCreated,
        );

        let err = runner.run_cycle().await.unwrap_err();
        assert!(matches!(err, TriggerError::Poll(PollError::Authentication)));
        assert_eq!(runner.store().load(&trigger()).await.unwrap(), seeded);
    }
}
