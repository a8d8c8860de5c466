//! The `messages` database drained by background sync.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ports::{PendingStore, StoreError};
use crate::storage::atomic_write;
use crate::types::PendingMutation;

pub(crate) const DATABASE_FILE: &str = "messages.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Database {
    next_id: u64,
    pending: Vec<PendingMutation>,
    #[serde(default)]
    dead_letter: Vec<PendingMutation>,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            next_id: 1,
            pending: Vec::new(),
            dead_letter: Vec::new(),
        }
    }
}

impl Database {
    fn add(&mut self, payload: serde_json::Value, created_at: OffsetDateTime) -> PendingMutation {
        let record = PendingMutation {
            id: self.next_id,
            payload,
            created_at,
            attempts: 0,
        };
        self.next_id += 1;
        self.pending.push(record.clone());
        record
    }

    fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        let before = self.pending.len();
        self.pending.retain(|record| record.id != id);
        if self.pending.len() == before {
            return Err(StoreError::UnknownRecord(id));
        }
        Ok(())
    }

    fn record_failure(&mut self, id: u64) -> Result<u32, StoreError> {
        let record = self
            .pending
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::UnknownRecord(id))?;
        record.attempts = record.attempts.saturating_add(1);
        Ok(record.attempts)
    }

    fn dead_letter(&mut self, id: u64) -> Result<(), StoreError> {
        let index = self
            .pending
            .iter()
            .position(|record| record.id == id)
            .ok_or(StoreError::UnknownRecord(id))?;
        let record = self.pending.remove(index);
        self.dead_letter.push(record);
        Ok(())
    }
}

/// Volatile store, used by tests and when no data directory is writable.
#[derive(Debug, Clone, Default)]
pub struct MemoryPendingStore {
    database: Arc<Mutex<Database>>,
    failing_deletes: Arc<Mutex<bool>>,
}

impl MemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later delete fail, as if storage had become unavailable.
    pub fn fail_deletes(&self, failing: bool) {
        *self.failing_deletes.lock().expect("pending store lock") = failing;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Database> {
        self.database.lock().expect("pending store lock")
    }
}

impl PendingStore for MemoryPendingStore {
    async fn add(
        &self,
        payload: serde_json::Value,
        created_at: OffsetDateTime,
    ) -> Result<PendingMutation, StoreError> {
        Ok(self.lock().add(payload, created_at))
    }

    async fn pending(&self) -> Result<Vec<PendingMutation>, StoreError> {
        Ok(self.lock().pending.clone())
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        if *self.failing_deletes.lock().expect("pending store lock") {
            return Err(StoreError::Io(std::io::Error::other("delete refused")));
        }
        self.lock().delete(id)
    }

    async fn record_failure(&self, id: u64) -> Result<u32, StoreError> {
        self.lock().record_failure(id)
    }

    async fn dead_letter(&self, id: u64) -> Result<(), StoreError> {
        self.lock().dead_letter(id)
    }

    async fn dead_letters(&self) -> Result<Vec<PendingMutation>, StoreError> {
        Ok(self.lock().dead_letter.clone())
    }
}

/// Store persisted as a single JSON document, rewritten atomically on every
/// change. The file is created lazily on the first write.
#[derive(Debug)]
pub struct FsPendingStore {
    path: PathBuf,
    database: tokio::sync::Mutex<Database>,
}

impl FsPendingStore {
    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(DATABASE_FILE);
        let database = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| StoreError::Corrupt(err.to_string()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Database::default(),
            Err(err) => return Err(StoreError::Io(err)),
        };
        Ok(Self {
            path,
            database: tokio::sync::Mutex::new(database),
        })
    }

    /// Applies `change` to a copy of the database and only keeps it once the
    /// copy has been written to disk.
    async fn commit<T>(
        &self,
        change: impl FnOnce(&mut Database) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut database = self.database.lock().await;
        let mut updated = database.clone();
        let value = change(&mut updated)?;
        let bytes =
            serde_json::to_vec_pretty(&updated).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&path, &bytes))
            .await
            .map_err(|err| StoreError::Io(std::io::Error::other(err)))??;
        *database = updated;
        Ok(value)
    }
}

impl PendingStore for FsPendingStore {
    async fn add(
        &self,
        payload: serde_json::Value,
        created_at: OffsetDateTime,
    ) -> Result<PendingMutation, StoreError> {
        self.commit(move |database| Ok(database.add(payload, created_at)))
            .await
    }

    async fn pending(&self) -> Result<Vec<PendingMutation>, StoreError> {
        Ok(self.database.lock().await.pending.clone())
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.commit(|database| database.delete(id)).await
    }

    async fn record_failure(&self, id: u64) -> Result<u32, StoreError> {
        self.commit(|database| database.record_failure(id)).await
    }

    async fn dead_letter(&self, id: u64) -> Result<(), StoreError> {
        self.commit(|database| database.dead_letter(id)).await
    }

    async fn dead_letters(&self) -> Result<Vec<PendingMutation>, StoreError> {
        Ok(self.database.lock().await.dead_letter.clone())
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::test_support::{create_temp_dir, fixed_now};
    use serde_json::json;

    #[tokio::test]
    async fn memory_store__should_assign_increasing_ids_in_insertion_order() {
        // Given
        let store = MemoryPendingStore::new();

        // When
        let first = store
            .add(json!({"text": "A"}), fixed_now())
            .await
            .expect("add");
        let second = store
            .add(json!({"text": "B"}), fixed_now())
            .await
            .expect("add");
        store.delete(first.id).await.expect("delete");
        let third = store
            .add(json!({"text": "C"}), fixed_now())
            .await
            .expect("add");

        // Then
        assert_eq!((first.id, second.id, third.id), (1, 2, 3));
        let ids: Vec<u64> = store
            .pending()
            .await
            .expect("pending")
            .iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn memory_store__should_move_record_to_dead_letter() {
        // Given
        let store = MemoryPendingStore::new();
        let record = store
            .add(json!({"text": "bad"}), fixed_now())
            .await
            .expect("add");

        // When
        let attempts = store.record_failure(record.id).await.expect("failure");
        store.dead_letter(record.id).await.expect("dead letter");

        // Then
        assert_eq!(attempts, 1);
        assert!(store.pending().await.expect("pending").is_empty());
        let dead = store.dead_letters().await.expect("dead letters");
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].attempts, 1);
    }

    #[tokio::test]
    async fn memory_store__should_reject_unknown_ids() {
        // Given
        let store = MemoryPendingStore::new();

        // Then
        assert!(matches!(
            store.delete(99).await,
            Err(StoreError::UnknownRecord(99))
        ));
        assert!(store.record_failure(99).await.is_err());
    }

    #[tokio::test]
    async fn fs_store__should_persist_records_and_id_counter() {
        // Given
        let dir = create_temp_dir("fs-pending");
        {
            let store = FsPendingStore::open_dir(&dir).expect("open store");
            let first = store
                .add(json!({"conversationId": 7, "text": "hola"}), fixed_now())
                .await
                .expect("add");
            store.delete(first.id).await.expect("delete");
            store
                .add(json!({"conversationId": 7, "text": "otra vez"}), fixed_now())
                .await
                .expect("add");
        }

        // When
        let store = FsPendingStore::open_dir(&dir).expect("reopen store");
        let next = store
            .add(json!({"conversationId": 7, "text": "tres"}), fixed_now())
            .await
            .expect("add");

        // Then
        let pending = store.pending().await.expect("pending");
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, 2);
        assert_eq!(pending[0].payload["text"], "otra vez");
        assert_eq!(pending[0].created_at, fixed_now());
        assert_eq!(next.id, 3);

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[tokio::test]
    async fn fs_store__should_not_create_file_until_first_write() {
        // Given
        let dir = create_temp_dir("fs-pending-lazy");

        // When
        let store = FsPendingStore::open_dir(&dir).expect("open store");

        // Then
        assert!(store.pending().await.expect("pending").is_empty());
        assert!(!dir.join(DATABASE_FILE).exists());

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }
}
