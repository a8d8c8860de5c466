use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::http::header::HeaderMap;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use base64::{STANDARD, decode_config, encode_config};
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;

use super::{Partition, Partitions};
use crate::ports::{CacheError, CacheStorage};
use crate::storage::atomic_write;
use crate::types::WorkerResponse;

const INDEX_FILE: &str = "partitions.json";

/// Cache partitions persisted as one JSON document per partition plus an
/// index holding the partition names in creation order.
///
/// Changes are written to disk first and published in memory after, so a
/// failed write leaves the visible state untouched. `writer` serializes
/// changes across the disk write; readers only see `partitions`.
#[derive(Debug)]
pub struct FsCacheStorage {
    dir: PathBuf,
    partitions: RwLock<Partitions>,
    writer: Mutex<()>,
}

#[derive(Serialize, Deserialize)]
struct StoredIndex {
    partitions: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct StoredPartition {
    entries: Vec<StoredEntry>,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl FsCacheStorage {
    /// Loads every partition found under `dir`, creating the directory when
    /// it does not exist yet.
    pub fn open_dir(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let mut partitions = Partitions::default();
        let index_path = dir.join(INDEX_FILE);
        let names = match std::fs::read(&index_path) {
            Ok(bytes) => {
                let index: StoredIndex =
                    serde_json::from_slice(&bytes).map_err(|err| CacheError::Corrupt {
                        partition: INDEX_FILE.to_string(),
                        reason: err.to_string(),
                    })?;
                index.partitions
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(CacheError::Io(err)),
        };

        for name in names {
            let entries = load_partition(&dir, &name)?;
            partitions.put_all(&name, entries);
        }

        Ok(Self {
            dir,
            partitions: RwLock::new(partitions),
            writer: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self) -> RwLockReadGuard<'_, Partitions> {
        self.partitions.read().expect("cache partitions lock")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Partitions> {
        self.partitions.write().expect("cache partitions lock")
    }

    /// Copy of one partition plus the index as it will read once the
    /// partition exists. The second value says whether it is new.
    fn snapshot(&self, name: &str) -> (Partition, bool, Vec<String>) {
        let partitions = self.read();
        let mut names = partitions.names();
        match partitions.get(name) {
            Some(partition) => (partition.clone(), false, names),
            None => {
                names.push(name.to_string());
                (Partition::default(), true, names)
            }
        }
    }

    async fn persist_index(&self, names: Vec<String>) -> Result<(), CacheError> {
        let index = StoredIndex { partitions: names };
        let bytes = serde_json::to_vec_pretty(&index).map_err(|err| CacheError::Corrupt {
            partition: INDEX_FILE.to_string(),
            reason: err.to_string(),
        })?;
        write_file(self.dir.join(INDEX_FILE), bytes).await
    }

    async fn persist_partition(
        &self,
        name: &str,
        partition: Option<&Partition>,
    ) -> Result<(), CacheError> {
        let path = self.dir.join(partition_file_name(name));
        let Some(partition) = partition else {
            return match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(CacheError::Io(err)),
            };
        };

        let stored = StoredPartition {
            entries: partition
                .entries()
                .iter()
                .map(|(key, response)| encode_entry(key, response))
                .collect(),
        };
        let bytes = serde_json::to_vec(&stored).map_err(|err| CacheError::Corrupt {
            partition: name.to_string(),
            reason: err.to_string(),
        })?;
        write_file(path, bytes).await
    }
}

impl CacheStorage for FsCacheStorage {
    async fn open(&self, partition: &str) -> Result<(), CacheError> {
        let _writer = self.writer.lock().await;
        let (empty, created, names) = self.snapshot(partition);
        if !created {
            return Ok(());
        }
        self.persist_partition(partition, Some(&empty)).await?;
        self.persist_index(names).await?;
        self.write().replace(partition, empty);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.read().names())
    }

    async fn delete(&self, partition: &str) -> Result<bool, CacheError> {
        let _writer = self.writer.lock().await;
        let remaining = {
            let partitions = self.read();
            if partitions.get(partition).is_none() {
                return Ok(false);
            }
            partitions
                .names()
                .into_iter()
                .filter(|name| name != partition)
                .collect::<Vec<_>>()
        };
        self.persist_index(remaining).await?;
        self.write().delete(partition);
        self.persist_partition(partition, None).await?;
        Ok(true)
    }

    async fn lookup(
        &self,
        partition: &str,
        key: &str,
    ) -> Result<Option<WorkerResponse>, CacheError> {
        Ok(self.read().lookup(partition, key))
    }

    async fn put(
        &self,
        partition: &str,
        key: &str,
        response: WorkerResponse,
    ) -> Result<(), CacheError> {
        let _writer = self.writer.lock().await;
        let (mut updated, created, names) = self.snapshot(partition);
        updated.put(key, response);
        self.persist_partition(partition, Some(&updated)).await?;
        if created {
            self.persist_index(names).await?;
        }
        self.write().replace(partition, updated);
        Ok(())
    }

    async fn put_all(
        &self,
        partition: &str,
        entries: Vec<(String, WorkerResponse)>,
    ) -> Result<(), CacheError> {
        let _writer = self.writer.lock().await;
        let (mut updated, created, names) = self.snapshot(partition);
        for (key, response) in entries {
            updated.put(&key, response);
        }
        self.persist_partition(partition, Some(&updated)).await?;
        if created {
            self.persist_index(names).await?;
        }
        self.write().replace(partition, updated);
        Ok(())
    }

    async fn entry_keys(&self, partition: &str) -> Result<Vec<String>, CacheError> {
        Ok(self.read().entry_keys(partition))
    }
}

async fn write_file(path: PathBuf, bytes: Vec<u8>) -> Result<(), CacheError> {
    tokio::task::spawn_blocking(move || atomic_write(&path, &bytes))
        .await
        .map_err(|err| CacheError::Io(std::io::Error::other(err)))??;
    Ok(())
}

fn load_partition(dir: &Path, name: &str) -> Result<Vec<(String, WorkerResponse)>, CacheError> {
    let path = dir.join(partition_file_name(name));
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(CacheError::Io(err)),
    };
    let corrupt = |reason: String| CacheError::Corrupt {
        partition: name.to_string(),
        reason,
    };
    let stored: StoredPartition =
        serde_json::from_slice(&bytes).map_err(|err| corrupt(err.to_string()))?;
    stored
        .entries
        .into_iter()
        .map(|entry| decode_entry(entry).map_err(corrupt))
        .collect()
}

/// Partition names come from configuration; anything outside a conservative
/// alphabet is hex-escaped so the name maps onto exactly one file.
fn partition_file_name(name: &str) -> String {
    let mut file_name = String::with_capacity(name.len() + 5);
    for byte in name.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' => {
                file_name.push(byte as char)
            }
            other => file_name.push_str(&format!("_{other:02x}")),
        }
    }
    file_name.push_str(".json");
    file_name
}

fn encode_entry(key: &str, response: &WorkerResponse) -> StoredEntry {
    StoredEntry {
        key: key.to_string(),
        status: response.status.as_u16(),
        headers: response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect(),
        body: encode_config(&response.body, STANDARD),
    }
}

fn decode_entry(entry: StoredEntry) -> Result<(String, WorkerResponse), String> {
    let status = StatusCode::from_u16(entry.status).map_err(|err| err.to_string())?;
    let mut headers = HeaderMap::new();
    for (name, value) in entry.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| err.to_string())?;
        let value = HeaderValue::from_str(&value).map_err(|err| err.to_string())?;
        headers.append(name, value);
    }
    let body = decode_config(&entry.body, STANDARD).map_err(|err| err.to_string())?;
    Ok((
        entry.key,
        WorkerResponse::new(status, headers, Bytes::from(body)),
    ))
}
