//! Per-request completion signals for consumer subscribes

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

use crate::endpoint::Endpoint;

/// Subscribe calls waiting for a first `register` reply, by subscription key
#[derive(Debug, Default)]
pub(crate) struct SubscribeWaiters {
    pending: Mutex<HashMap<Endpoint, Vec<Arc<Notify>>>>,
}

impl SubscribeWaiters {
    /// File a new waiter under `key`
    ///
    /// Must be called before the request is written, so a reply that beats
    /// the caller to `notified()` still leaves a permit behind.
    pub(crate) fn register(&self, key: &Endpoint) -> Arc<Notify> {
        let waiter = Arc::new(Notify::new());
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .push(Arc::clone(&waiter));
        waiter
    }

    /// Release every waiter filed under `key`
    pub(crate) fn release(&self, key: &Endpoint) {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(waiters) = pending.get(key) {
            for waiter in waiters {
                waiter.notify_one();
            }
        }
    }

    /// Withdraw a waiter once its caller stops waiting
    pub(crate) fn remove(&self, key: &Endpoint, waiter: &Arc<Notify>) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(waiters) = pending.get_mut(key) {
            waiters.retain(|w| !Arc::ptr_eq(w, waiter));
            if waiters.is_empty() {
                pending.remove(key);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }
}
