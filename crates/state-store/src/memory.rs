use std::collections::HashMap;

use async_trait::async_trait;
use poller::{PollState, PollStateStore, StateStoreError, TriggerId};
use tokio::sync::RwLock;

/// Volatile [`PollStateStore`]; state is lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: RwLock<HashMap<TriggerId, PollState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStateStore for InMemoryStateStore {
    async fn load(&self, trigger: &TriggerId) -> Result<PollState, StateStoreError> {
        Ok(self
            .states
            .read()
            .await
            .get(trigger)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, trigger: &TriggerId, state: &PollState) -> Result<(), StateStoreError> {
        self.states
            .write()
            .await
            .insert(trigger.clone(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn triggers_are_isolated() {
        let store = InMemoryStateStore::new();
        let a = TriggerId::new("a").unwrap();
        let b = TriggerId::new("b").unwrap();

        let mut state = PollState::default();
        state.processed_ids.contacts = ["c1"].into_iter().collect();
        store.save(&a, &state).await.unwrap();

        assert_eq!(store.load(&a).await.unwrap(), state);
        assert_eq!(store.load(&b).await.unwrap(), PollState::default());
    }
}
