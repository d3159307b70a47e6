//! Per-subscription cache of endpoints received from the peer
//!
//! Same layout as a stream table: an outer map guarded for insert-if-absent,
//! with each per-key set behind its own lock so that updates to different
//! keys do not contend. Every mutation hands back a snapshot taken under the
//! per-key lock; listeners are notified from the snapshot, never from the
//! live set.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::endpoint::Endpoint;

type EndpointSet = Arc<RwLock<HashSet<Endpoint>>>;

/// Subscription key -> endpoints currently believed to match it
#[derive(Debug, Default)]
pub struct ReceivedMap {
    entries: RwLock<HashMap<Endpoint, EndpointSet>>,
}

impl ReceivedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `endpoint` under `key`, creating the set if needed
    ///
    /// Returns the full set after the insert.
    pub async fn add(&self, key: &Endpoint, endpoint: Endpoint) -> Vec<Endpoint> {
        let set = self.get_or_create(key).await;
        let mut set = set.write().await;
        set.insert(endpoint);
        set.iter().cloned().collect()
    }

    /// Remove `endpoint` from `key`'s set, if both exist
    ///
    /// Returns the full set after the removal (empty when the key is absent).
    pub async fn remove(&self, key: &Endpoint, endpoint: &Endpoint) -> Vec<Endpoint> {
        let set = self.entries.read().await.get(key).cloned();
        match set {
            Some(set) => {
                let mut set = set.write().await;
                set.remove(endpoint);
                set.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Snapshot of the set under `key`
    pub async fn get(&self, key: &Endpoint) -> Vec<Endpoint> {
        let set = self.entries.read().await.get(key).cloned();
        match set {
            Some(set) => set.read().await.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Drop the whole entry for exactly `key`
    pub async fn remove_key(&self, key: &Endpoint) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Snapshot of every key and its set
    pub async fn snapshot(&self) -> Vec<(Endpoint, Vec<Endpoint>)> {
        let entries: Vec<(Endpoint, EndpointSet)> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(key, set)| (key.clone(), Arc::clone(set)))
            .collect();

        let mut snapshot = Vec::with_capacity(entries.len());
        for (key, set) in entries {
            let endpoints = set.read().await.iter().cloned().collect();
            snapshot.push((key, endpoints));
        }
        snapshot
    }

    /// Number of keys with an entry
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn get_or_create(&self, key: &Endpoint) -> EndpointSet {
        if let Some(set) = self.entries.read().await.get(key) {
            return Arc::clone(set);
        }
        let mut entries = self.entries.write().await;
        Arc::clone(entries.entry(key.clone()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(s: &str) -> Endpoint {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_add_dedupes() {
        let received = ReceivedMap::new();
        let key = ep("service://*/Foo");
        let e = ep("service://10.0.0.1:20880/Foo?dynamic=true");

        received.add(&key, e.clone()).await;
        let set = received.add(&key, e.clone()).await;

        assert_eq!(set, vec![e]);
        assert_eq!(received.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let received = ReceivedMap::new();
        let key = ep("service://*/Foo");
        let e = ep("service://10.0.0.1:20880/Foo");

        assert!(received.remove(&key, &e).await.is_empty());
        assert!(received.is_empty().await);

        received.add(&key, e.clone()).await;
        let other = ep("service://10.0.0.2:20880/Foo");
        assert_eq!(received.remove(&key, &other).await, vec![e.clone()]);
        assert!(received.remove(&key, &e).await.is_empty());
        // Key survives with an empty set until unsubscribed
        assert_eq!(received.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_key() {
        let received = ReceivedMap::new();
        let key = ep("service://*/Foo");
        received.add(&key, ep("service://10.0.0.1:20880/Foo")).await;

        assert!(received.remove_key(&key).await);
        assert!(!received.remove_key(&key).await);
        assert!(received.get(&key).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds() {
        let received = Arc::new(ReceivedMap::new());
        let key = ep("service://*/Foo");

        let handles: Vec<_> = (0..32u16)
            .map(|i| {
                let received = Arc::clone(&received);
                let key = key.clone();
                tokio::spawn(async move {
                    let e = Endpoint::new("service", "10.0.0.1", 20000 + i, "Foo");
                    received.add(&key, e).await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(received.get(&key).await.len(), 32);
        assert_eq!(received.snapshot().await[0].1.len(), 32);
    }
}
