//! Process-local [`KeyValueStore`] with Redis-like expiry semantics.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::ports::{KeyValueStore, KeyValueStoreError};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct State {
    values: HashMap<String, Entry>,
    sets: HashMap<String, HashSet<String>>,
}

impl State {
    fn live(&mut self, key: &str, now: Instant) -> Option<&mut Entry> {
        if self.values.get(key).is_some_and(|entry| !entry.live(now)) {
            self.values.remove(key);
        }
        self.values.get_mut(key)
    }
}

/// Single-process stand-in for Redis used when no Redis URL is configured.
#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    state: Arc<Mutex<State>>,
}

impl MemoryKeyValueStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError> {
        Ok(self
            .state()
            .live(key, Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KeyValueStoreError> {
        self.state().values.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), KeyValueStoreError> {
        let mut state = self.state();
        for key in keys {
            state.values.remove(key);
            state.sets.remove(key);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, KeyValueStoreError> {
        Ok(self.state().live(key, Instant::now()).is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KeyValueStoreError> {
        let now = Instant::now();
        Ok(self
            .state()
            .live(key, now)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<u64, KeyValueStoreError> {
        let now = Instant::now();
        let mut state = self.state();
        let next = match state.live(key, now) {
            Some(entry) => {
                let count = entry.value.parse::<u64>().map_err(|err| {
                    KeyValueStoreError::backend(format!("value at {key} is not a counter: {err}"))
                })?;
                let next = count.saturating_add(1);
                entry.value = next.to_string();
                next
            }
            None => {
                state.values.insert(
                    key.to_owned(),
                    Entry {
                        value: "1".to_owned(),
                        expires_at: Some(now + window),
                    },
                );
                1
            }
        };
        Ok(next)
    }

    async fn add_to_set(&self, set: &str, member: &str) -> Result<(), KeyValueStoreError> {
        self.state()
            .sets
            .entry(set.to_owned())
            .or_default()
            .insert(member.to_owned());
        Ok(())
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>, KeyValueStoreError> {
        Ok(self
            .state()
            .sets
            .get(set)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }
}
