use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use super::store::PersistentStore;
use crate::error::StorageError;

/// File-backed store: one file per key under the app data directory.
///
/// Writes go through a sibling temp file and a rename so a crash mid-write
/// leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at [`super::data_dir`].
    pub fn open_default() -> std::io::Result<Self> {
        Ok(Self::new(super::data_dir()?))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl PersistentStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Backend {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let backend = |e| StorageError::Backend {
            key: key.to_string(),
            source: e,
        };
        tokio::fs::write(&tmp, value).await.map_err(backend)?;
        tokio::fs::rename(&tmp, &path).await.map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.get("Timers").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set("ListOfCategory", r#"["Work"]"#).await.unwrap();
        assert_eq!(
            store.get("ListOfCategory").await.unwrap().as_deref(),
            Some(r#"["Work"]"#)
        );
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set("Timers", "[]").await.unwrap();
        store.set("Timers", r#"[{"name":"T1"}]"#).await.unwrap();
        assert_eq!(
            store.get("Timers").await.unwrap().as_deref(),
            Some(r#"[{"name":"T1"}]"#)
        );
        // No leftover temp file after a completed write.
        assert!(!dir.path().join("Timers.json.tmp").exists());
    }
}
