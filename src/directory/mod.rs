//! Canonical registration state
//!
//! The registry core does not own the set of registered endpoints, the
//! subscription table or the last-notified results. Those belong to a
//! [`Directory`] (typically the retry/failback layer), which the core reads
//! from and notifies through. [`MemoryDirectory`] is the in-process
//! implementation.

pub mod memory;

use std::sync::Arc;

use crate::endpoint::Endpoint;

pub use memory::MemoryDirectory;

/// Receives the full current endpoint set for a subscription key
pub trait NotifyListener: Send + Sync {
    fn notify(&self, endpoints: &[Endpoint]);
}

impl<F> NotifyListener for F
where
    F: Fn(&[Endpoint]) + Send + Sync,
{
    fn notify(&self, endpoints: &[Endpoint]) {
        self(endpoints)
    }
}

/// Shared listener handle; identity is the allocation, not the value
pub type Listener = Arc<dyn NotifyListener>;

/// Whether two handles point at the same listener
pub fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Owner of canonical registration and subscription state
///
/// Calls are synchronous and expected to be short; the core never holds one
/// of its own locks while calling in.
pub trait Directory: Send + Sync + 'static {
    /// Record a locally registered endpoint
    fn register(&self, endpoint: &Endpoint);

    /// Forget a locally registered endpoint
    fn unregister(&self, endpoint: &Endpoint);

    /// Add `listener` under subscription `key`
    fn subscribe(&self, key: &Endpoint, listener: Listener);

    /// Remove `listener` from subscription `key`
    fn unsubscribe(&self, key: &Endpoint, listener: &Listener);

    /// Snapshot of locally registered endpoints
    fn registered(&self) -> Vec<Endpoint>;

    /// Snapshot of subscription keys with their listeners
    fn subscribed(&self) -> Vec<(Endpoint, Vec<Listener>)>;

    /// Last result notified for exactly `key`
    fn notified(&self, key: &Endpoint) -> Vec<Endpoint>;

    /// Fallback cache (disk or memory) for `key`
    fn cached(&self, key: &Endpoint) -> Vec<Endpoint>;

    /// Record `endpoints` as the current result for `key` and invoke `listener`
    fn notify(&self, key: &Endpoint, listener: &Listener, endpoints: &[Endpoint]);
}
