use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::Partitions;
use crate::ports::{CacheError, CacheStorage};
use crate::types::WorkerResponse;

#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStorage {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    partitions: Partitions,
    failing_deletes: HashSet<String>,
    failing_writes: bool,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later delete of `partition` fail with an i/o error.
    pub fn fail_deletes_of(&self, partition: &str) {
        self.lock().failing_deletes.insert(partition.to_string());
    }

    /// Makes every later write fail with an i/o error.
    pub fn fail_writes(&self, failing: bool) {
        self.lock().failing_writes = failing;
    }

    pub fn entry_count(&self, partition: &str) -> usize {
        self.lock()
            .partitions
            .get(partition)
            .map(|partition| partition.len())
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("cache storage lock")
    }

    fn injected(reason: &str) -> CacheError {
        CacheError::Io(std::io::Error::other(reason.to_string()))
    }
}

impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, partition: &str) -> Result<(), CacheError> {
        self.lock().partitions.open(partition);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.lock().partitions.names())
    }

    async fn delete(&self, partition: &str) -> Result<bool, CacheError> {
        let mut inner = self.lock();
        if inner.failing_deletes.contains(partition) {
            return Err(Self::injected("delete refused"));
        }
        Ok(inner.partitions.delete(partition))
    }

    async fn lookup(
        &self,
        partition: &str,
        key: &str,
    ) -> Result<Option<WorkerResponse>, CacheError> {
        Ok(self.lock().partitions.lookup(partition, key))
    }

    async fn put(
        &self,
        partition: &str,
        key: &str,
        response: WorkerResponse,
    ) -> Result<(), CacheError> {
        let mut inner = self.lock();
        if inner.failing_writes {
            return Err(Self::injected("write refused"));
        }
        inner.partitions.put(partition, key, response);
        Ok(())
    }

    async fn put_all(
        &self,
        partition: &str,
        entries: Vec<(String, WorkerResponse)>,
    ) -> Result<(), CacheError> {
        let mut inner = self.lock();
        if inner.failing_writes {
            return Err(Self::injected("write refused"));
        }
        inner.partitions.put_all(partition, entries);
        Ok(())
    }

    async fn entry_keys(&self, partition: &str) -> Result<Vec<String>, CacheError> {
        Ok(self.lock().partitions.entry_keys(partition))
    }
}
