use std::hash::BuildHasher;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hashbrown::{DefaultHashBuilder, HashMap};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::clock::{self, Clock};

const SHARD_COUNT: usize = 16;

/// A stored value and its optional expiry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomVariable {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CustomVariable {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

type Shard = RwLock<HashMap<String, CustomVariable>>;

/// Sharded name → value map. Readers of different names never contend on
/// the same lock unless they hash to the same shard.
pub struct CustomVariableStore {
    shards: Vec<Shard>,
    hasher: DefaultHashBuilder,
    clock: Arc<dyn Clock>,
}

impl CustomVariableStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::default()).collect(),
            hasher: DefaultHashBuilder::default(),
            clock,
        }
    }

    fn shard(&self, name: &str) -> &Shard {
        let index = self.hasher.hash_one(name) as usize % self.shards.len();
        &self.shards[index]
    }

    /// Set a value. A `ttl` of `None` or `Some(0)` never expires.
    pub fn set(&self, name: &str, value: Value, ttl_secs: Option<u64>) {
        let expires_at = ttl_secs
            .filter(|ttl| *ttl > 0)
            .map(|ttl| clock::add(self.clock.now(), Duration::from_secs(ttl)));

        self.shard(name)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), CustomVariable { value, expires_at });

        tracing::debug!(name, ?expires_at, "Custom variable set");
    }

    /// Current value, or `None` if missing or expired
    pub fn get(&self, name: &str) -> Option<Value> {
        self.entry(name).map(|v| v.value)
    }

    /// Current entry including its expiry
    pub fn entry(&self, name: &str) -> Option<CustomVariable> {
        let now = self.clock.now();
        let shard = self.shard(name);

        {
            let map = shard.read().unwrap_or_else(PoisonError::into_inner);
            match map.get(name) {
                None => return None,
                Some(v) if !v.is_expired(now) => return Some(v.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict unless it was replaced between the two locks
        let mut map = shard.write().unwrap_or_else(PoisonError::into_inner);
        if map.get(name).is_some_and(|v| v.is_expired(now)) {
            map.remove(name);
            tracing::debug!(name, "Custom variable expired");
            return None;
        }
        map.get(name).cloned()
    }

    /// Remove a value. Returns whether a live value was removed.
    pub fn delete(&self, name: &str) -> bool {
        let now = self.clock.now();
        self.shard(name)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some_and(|v| !v.is_expired(now))
    }

    /// Snapshot of every live entry, sorted by name
    pub fn entries(&self) -> Vec<(String, CustomVariable)> {
        let now = self.clock.now();
        let mut entries: Vec<_> = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .filter(|(_, v)| !v.is_expired(now))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let removed: usize = self
            .shards
            .iter()
            .map(|shard| {
                let mut map = shard.write().unwrap_or_else(PoisonError::into_inner);
                let before = map.len();
                map.retain(|_, v| !v.is_expired(now));
                before - map.len()
            })
            .sum();

        if removed > 0 {
            tracing::debug!(removed, "Swept expired custom variables");
        }
        removed
    }

    /// Run `sweep` every `interval` until the handle is aborted
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.sweep();
            }
        })
    }
}
