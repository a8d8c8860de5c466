//! Cache partitions backing the worker strategies.
//!
//! Both adapters share [`Partitions`], an ordered set of named partitions
//! whose entries keep insertion order. [`MemoryCacheStorage`] keeps it behind
//! a lock; [`FsCacheStorage`] additionally writes every change through to disk
//! so the shell survives a restart of the front. Lookups only ever take a
//! short read lock and never wait on a disk write.

mod fs;
mod memory;

pub use fs::FsCacheStorage;
pub use memory::MemoryCacheStorage;

use crate::types::WorkerResponse;

#[derive(Debug, Clone, Default)]
pub(crate) struct Partition {
    entries: Vec<(String, WorkerResponse)>,
}

impl Partition {
    fn lookup(&self, key: &str) -> Option<&WorkerResponse> {
        self.entries
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, response)| response)
    }

    fn put(&mut self, key: &str, response: WorkerResponse) {
        self.entries.retain(|(entry_key, _)| entry_key != key);
        self.entries.push((key.to_string(), response));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> &[(String, WorkerResponse)] {
        &self.entries
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Partitions {
    partitions: Vec<(String, Partition)>,
}

impl Partitions {
    pub(crate) fn open(&mut self, name: &str) -> &mut Partition {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                self.partitions.push((name.to_string(), Partition::default()));
                self.partitions.len() - 1
            }
        };
        &mut self.partitions[index].1
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Partition> {
        self.position(name).map(|index| &self.partitions[index].1)
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.partitions.iter().map(|(name, _)| name.clone()).collect()
    }

    pub(crate) fn delete(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.partitions.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn lookup(&self, name: &str, key: &str) -> Option<WorkerResponse> {
        self.get(name)
            .and_then(|partition| partition.lookup(key))
            .cloned()
    }

    pub(crate) fn put(&mut self, name: &str, key: &str, response: WorkerResponse) {
        self.open(name).put(key, response);
    }

    pub(crate) fn replace(&mut self, name: &str, partition: Partition) {
        *self.open(name) = partition;
    }

    pub(crate) fn put_all(&mut self, name: &str, entries: Vec<(String, WorkerResponse)>) {
        let partition = self.open(name);
        for (key, response) in entries {
            partition.put(&key, response);
        }
    }

    pub(crate) fn entry_keys(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|partition| {
                partition
                    .entries
                    .iter()
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.partitions
            .iter()
            .position(|(partition, _)| partition == name)
    }
}
