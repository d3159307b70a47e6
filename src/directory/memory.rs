//! In-memory directory

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use crate::endpoint::{is_match, Endpoint};

use super::{same_listener, Directory, Listener};

/// Directory kept entirely in process memory
///
/// The fallback cache is keyed by service key and refreshed on every
/// notification; [`MemoryDirectory::load_cache`] seeds it from a previous
/// run.
#[derive(Default)]
pub struct MemoryDirectory {
    registered: RwLock<HashSet<Endpoint>>,
    subscribed: RwLock<HashMap<Endpoint, Vec<Listener>>>,
    notified: RwLock<HashMap<Endpoint, Vec<Endpoint>>>,
    cache: RwLock<HashMap<String, Vec<Endpoint>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the fallback cache, grouping endpoints by service key
    pub fn load_cache(&self, endpoints: impl IntoIterator<Item = Endpoint>) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        for endpoint in endpoints {
            cache
                .entry(endpoint.service_key())
                .or_default()
                .push(endpoint);
        }
    }

    /// Number of listeners under `key`
    pub fn listener_count(&self, key: &Endpoint) -> usize {
        self.subscribed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map_or(0, Vec::len)
    }
}

impl Directory for MemoryDirectory {
    fn register(&self, endpoint: &Endpoint) {
        self.registered
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint.clone());
    }

    fn unregister(&self, endpoint: &Endpoint) {
        self.registered
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(endpoint);
    }

    fn subscribe(&self, key: &Endpoint, listener: Listener) {
        let mut subscribed = self.subscribed.write().unwrap_or_else(PoisonError::into_inner);
        let listeners = subscribed.entry(key.clone()).or_default();
        if !listeners.iter().any(|l| same_listener(l, &listener)) {
            listeners.push(listener);
        }
    }

    fn unsubscribe(&self, key: &Endpoint, listener: &Listener) {
        let mut subscribed = self.subscribed.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(listeners) = subscribed.get_mut(key) {
            listeners.retain(|l| !same_listener(l, listener));
            if listeners.is_empty() {
                subscribed.remove(key);
            }
        }
    }

    fn registered(&self) -> Vec<Endpoint> {
        self.registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn subscribed(&self) -> Vec<(Endpoint, Vec<Listener>)> {
        self.subscribed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, listeners)| (key.clone(), listeners.clone()))
            .collect()
    }

    fn notified(&self, key: &Endpoint) -> Vec<Endpoint> {
        self.notified
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn cached(&self, key: &Endpoint) -> Vec<Endpoint> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key.service_key())
            .map(|endpoints| {
                endpoints
                    .iter()
                    .filter(|e| is_match(key, e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn notify(&self, key: &Endpoint, listener: &Listener, endpoints: &[Endpoint]) {
        self.notified
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), endpoints.to_vec());
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.service_key(), endpoints.to_vec());

        tracing::debug!(key = %key, count = endpoints.len(), "Notify listener");
        listener.notify(endpoints);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn ep(s: &str) -> Endpoint {
        s.parse().unwrap()
    }

    #[test]
    fn test_register_unregister() {
        let dir = MemoryDirectory::new();
        let e = ep("service://10.0.0.1:20880/Foo");

        dir.register(&e);
        dir.register(&e);
        assert_eq!(dir.registered(), vec![e.clone()]);

        dir.unregister(&e);
        assert!(dir.registered().is_empty());
    }

    #[test]
    fn test_subscribe_dedupes_listener() {
        let dir = MemoryDirectory::new();
        let key = ep("service://*/Foo");
        let listener: Listener = Arc::new(|_: &[Endpoint]| {});

        dir.subscribe(&key, Arc::clone(&listener));
        dir.subscribe(&key, Arc::clone(&listener));
        assert_eq!(dir.listener_count(&key), 1);

        let other: Listener = Arc::new(|_: &[Endpoint]| {});
        dir.subscribe(&key, Arc::clone(&other));
        assert_eq!(dir.listener_count(&key), 2);

        dir.unsubscribe(&key, &listener);
        dir.unsubscribe(&key, &other);
        assert_eq!(dir.listener_count(&key), 0);
        assert!(dir.subscribed().is_empty());
    }

    #[test]
    fn test_notify_records_and_invokes() {
        let dir = MemoryDirectory::new();
        let key = ep("service://*/Foo");
        let e = ep("service://10.0.0.1:20880/Foo");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: Listener = Arc::new(move |endpoints: &[Endpoint]| {
            sink.lock().unwrap().push(endpoints.to_vec());
        });

        dir.notify(&key, &listener, &[e.clone()]);

        assert_eq!(dir.notified(&key), vec![e.clone()]);
        assert_eq!(dir.cached(&key), vec![e.clone()]);
        assert_eq!(*seen.lock().unwrap(), vec![vec![e]]);
    }

    #[test]
    fn test_cached_filters_by_pattern() {
        let dir = MemoryDirectory::new();
        dir.load_cache(vec![
            ep("service://10.0.0.1:20880/Foo"),
            ep("service://10.0.0.2:20880/Foo?enabled=false"),
            ep("service://10.0.0.3:20880/Bar"),
        ]);

        let cached = dir.cached(&ep("service://*/Foo"));
        assert_eq!(cached, vec![ep("service://10.0.0.1:20880/Foo")]);
    }
}
