use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use poller::{PollState, PollStateStore, StateStoreError, TriggerId};
use tracing::debug;

/// [`PollStateStore`] keeping `<dir>/<trigger>.json` per trigger.
///
/// Trigger ids are escaped into file names: ASCII letters, digits, `-` and
/// `_` are kept, every other byte becomes `%XX`. The mapping is injective, so
/// distinct triggers never share a file.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `trigger`.
    pub fn path_for(&self, trigger: &TriggerId) -> PathBuf {
        self.dir.join(format!("{}.json", escape_file_stem(trigger.as_str())))
    }
}

fn escape_file_stem(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[async_trait]
impl PollStateStore for FileStateStore {
    async fn load(&self, trigger: &TriggerId) -> Result<PollState, StateStoreError> {
        let path = self.path_for(trigger);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(trigger = %trigger, "No stored poll state; starting empty");
                return Ok(PollState::default());
            }
            Err(source) => {
                return Err(StateStoreError::Io {
                    trigger: trigger.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| StateStoreError::Corrupt {
            trigger: trigger.clone(),
            source,
        })
    }

    async fn save(&self, trigger: &TriggerId, state: &PollState) -> Result<(), StateStoreError> {
        let io_err = |source| StateStoreError::Io {
            trigger: trigger.clone(),
            source,
        };

        let body = serde_json::to_vec_pretty(state).map_err(|source| StateStoreError::Corrupt {
            trigger: trigger.clone(),
            source,
        })?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        let path = self.path_for(trigger);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err)?;

        debug!(trigger = %trigger, path = %path.display(), "Saved poll state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use poller::Timestamp;

    use super::*;

    fn trigger(name: &str) -> TriggerId {
        TriggerId::new(name).unwrap()
    }

    #[tokio::test]
    async fn missing_document_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state"));
        let state = store.load(&trigger("contacts")).await.unwrap();
        assert_eq!(state, PollState::default());
    }

    #[tokio::test]
    async fn saved_state_survives_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PollState::default();
        state.processed_ids.contacts = ["a", "b"].into_iter().collect();
        state.last_poll_time = Some(Timestamp::now());

        FileStateStore::new(dir.path())
            .save(&trigger("contacts"), &state)
            .await
            .unwrap();
        let reloaded = FileStateStore::new(dir.path())
            .load(&trigger("contacts"))
            .await
            .unwrap();

        assert_eq!(reloaded, state);
        assert!(!dir.path().join("contacts.json.tmp").exists());
    }

    #[tokio::test]
    async fn document_uses_storage_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        let mut state = PollState::default();
        state.processed_ids.email_lists = [r#"["a@x.com","L1"]"#].into_iter().collect();
        store.save(&trigger("lists"), &state).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path_for(&trigger("lists"))).unwrap())
                .unwrap();
        assert_eq!(raw["processedIds"]["emailLists"][0], r#"["a@x.com","L1"]"#);
    }

    #[tokio::test]
    async fn corrupt_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        std::fs::write(store.path_for(&trigger("bad")), b"{not json").unwrap();

        let err = store.load(&trigger("bad")).await.unwrap_err();
        assert!(matches!(err, StateStoreError::Corrupt { .. }));
    }

    #[test]
    fn trigger_ids_are_escaped_injectively() {
        assert_eq!(escape_file_stem("contacts-new_1"), "contacts-new_1");
        assert_eq!(escape_file_stem("a/b"), "a%2Fb");
        assert_ne!(escape_file_stem("a.b"), escape_file_stem("a%2Eb"));
    }
}
