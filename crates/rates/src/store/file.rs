//! File-backed snapshot store implementation

use crate::error::StorageError;
use crate::store::traits::SnapshotStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// On-disk document: one JSON object mapping keys to text values
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    entries: BTreeMap<String, String>,
}

/// JSON-file snapshot store.
///
/// The whole store is one small JSON document, rewritten on every `set`
/// through a temp-file-then-rename so a crash mid-write cannot leave a
/// truncated store behind. Values must be UTF-8 text (the monitor only ever
/// stores JSON); binary data is rejected with [`StorageError::NotText`].
pub struct FileSnapshotStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the document
    write_lock: Mutex<()>,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoreDocument, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn save(&self, document: &StoreDocument) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let document = self.load().await?;
        Ok(document
            .entries
            .get(key)
            .map(|value| value.clone().into_bytes()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let text = String::from_utf8(value).map_err(|_| StorageError::NotText {
            key: key.to_string(),
        })?;

        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        document.entries.insert(key.to_string(), text);
        self.save(&document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::error::StorageError;

    fn temp_store() -> FileSnapshotStore {
        let path = std::env::temp_dir().join(format!("fxgap-store-{}.json", uuid::Uuid::new_v4()));
        FileSnapshotStore::new(path)
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let store = temp_store();
        assert_eq!(store.get("last_snapshot").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get_survives_reopen() {
        let store = temp_store();
        store
            .set("last_snapshot", b"{\"official_rate\":36.58}".to_vec())
            .await
            .unwrap();

        // A brand-new store over the same path sees the value
        let reopened = FileSnapshotStore::new(store.path().to_path_buf());
        assert_eq!(
            reopened.get("last_snapshot").await.unwrap(),
            Some(b"{\"official_rate\":36.58}".to_vec())
        );

        tokio::fs::remove_file(store.path()).await.ok();
    }

    #[tokio::test]
    async fn test_binary_values_are_rejected() {
        let store = temp_store();
        let err = store.set("k", vec![0xff, 0xfe]).await.unwrap_err();
        assert_matches!(err, StorageError::NotText { .. });
    }

    #[tokio::test]
    async fn test_corrupt_document_is_a_storage_error() {
        let store = temp_store();
        tokio::fs::write(store.path(), b"not json at all").await.unwrap();

        assert_matches!(store.get("k").await, Err(StorageError::Codec(_)));

        tokio::fs::remove_file(store.path()).await.ok();
    }
}
