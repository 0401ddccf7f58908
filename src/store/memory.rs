//! In-memory shared store.
//!
//! Implements the same contract as the Redis backend with process-local
//! state: suitable for tests and single-instance deployments only, since
//! other gateway processes cannot observe it.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::store::{SharedStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Scalar(String),
    Set(HashSet<String>),
    List(Vec<String>),
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Process-local store. Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_live_entry<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&mut Entry>) -> T,
    ) -> T {
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
        }
        f(entries.get_mut(key))
    }

    fn insert(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|t| Instant::now() + t),
            },
        );
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.with_live_entry(key, |entry| match entry {
            Some(Entry { value: Value::Scalar(s), .. }) => Some(s.clone()),
            _ => None,
        }))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.insert(key, Value::Scalar(value.to_string()), Some(ttl));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        entries.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.with_live_entry(key, |entry| entry.is_some()))
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
        }
        match entries.get_mut(key) {
            Some(Entry { value: Value::Scalar(s), .. }) => {
                let n = s
                    .parse::<i64>()
                    .map_err(|_| StoreError::Unavailable("non-integer value".into()))?
                    + 1;
                *s = n.to_string();
                Ok(n)
            }
            Some(_) => Err(StoreError::Unavailable("wrong value type".into())),
            None => {
                entries.insert(
                    key.to_string(),
                    Entry { value: Value::Scalar("1".to_string()), expires_at: None },
                );
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.with_live_entry(key, |entry| {
            if let Some(entry) = entry {
                entry.expires_at = Some(Instant::now() + ttl);
            }
        });
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        Ok(self.with_live_entry(key, |entry| {
            entry
                .and_then(|e| e.expires_at)
                .map(|at| at.saturating_duration_since(Instant::now()))
        }))
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
        }
        match entries.get_mut(key) {
            Some(Entry { value: Value::Set(members), .. }) => {
                members.insert(member.to_string());
            }
            _ => {
                let mut members = HashSet::new();
                members.insert(member.to_string());
                entries.insert(
                    key.to_string(),
                    Entry { value: Value::Set(members), expires_at: None },
                );
            }
        }
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.with_live_entry(key, |entry| {
            if let Some(Entry { value: Value::Set(members), .. }) = entry {
                members.remove(member);
            }
        });
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.with_live_entry(key, |entry| match entry {
            Some(Entry { value: Value::Set(members), .. }) => {
                members.iter().cloned().collect()
            }
            _ => Vec::new(),
        }))
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
        }
        match entries.get_mut(key) {
            Some(Entry { value: Value::List(items), .. }) => {
                items.push(value.to_string());
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry { value: Value::List(vec![value.to_string()]), expires_at: None },
                );
            }
        }
        Ok(())
    }
}
