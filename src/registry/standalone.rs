//! Standalone registry
//!
//! Ties a [`Directory`] to one registry link. Each public operation first
//! updates the directory, then talks to the peer, then applies the change
//! locally; the `do_*` methods are the network half alone, for a retry
//! layer that keeps its own bookkeeping.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::client::connector;
use crate::directory::{Directory, Listener};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::probe::ExpirationProber;
use crate::protocol::constants::{ANY_VALUE, REGISTER_KEY};
use crate::protocol::Message;
use crate::server::listener;
use crate::session::{ConnectionState, Role};
use crate::stats::StatsSnapshot;

use super::config::RegistryConfig;
use super::dispatch::RegistryCore;

/// Point-to-point registry over a single line-oriented TCP link
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use standalone_registry::{Endpoint, MemoryDirectory, RegistryConfig, StandaloneRegistry};
///
/// # async fn example() -> standalone_registry::Result<()> {
/// let config = RegistryConfig::from_url("standalone://127.0.0.1:4234?role=server")?;
/// let registry = StandaloneRegistry::new(config, Arc::new(MemoryDirectory::new())).await?;
///
/// let endpoint: Endpoint = "service://10.0.0.1:20880/Foo?dynamic=true".parse().unwrap();
/// registry.register(&endpoint).await;
/// # Ok(())
/// # }
/// ```
pub struct StandaloneRegistry<D: Directory> {
    core: Arc<RegistryCore<D>>,
    receiver: JoinHandle<()>,
    local_addr: SocketAddr,
    prober: ExpirationProber,
    destroyed: AtomicBool,
}

impl<D: Directory> StandaloneRegistry<D> {
    /// Open the link for the configured role and start the receive loop
    ///
    /// Fails if the provider cannot bind or the consumer cannot connect;
    /// nothing is retried.
    pub async fn new(config: RegistryConfig, directory: Arc<D>) -> Result<Self> {
        let prober = ExpirationProber::from_config(&config);

        let (core, receiver, local_addr) = match config.role {
            Role::Provider => {
                let tcp_listener = listener::bind(&config)?;
                let local_addr = tcp_listener.local_addr()?;
                let core = Arc::new(RegistryCore::new(
                    config,
                    directory,
                    ConnectionState::provider(),
                ));
                let receiver = tokio::spawn(listener::accept_loop(Arc::clone(&core), tcp_listener));

                tracing::info!(addr = %local_addr, "Standalone registry listening");
                (core, receiver, local_addr)
            }
            Role::Consumer => {
                let (reader, connection) = connector::connect(&config).await?;
                let connection = Arc::new(connection);
                let core = Arc::new(RegistryCore::new(
                    config,
                    directory,
                    ConnectionState::consumer(Arc::clone(&connection)),
                ));
                let receiver = tokio::spawn(connector::read_loop(
                    Arc::clone(&core),
                    reader,
                    Arc::clone(&connection),
                ));

                let local_addr = connection.peer_addr();
                (core, receiver, local_addr)
            }
        };

        Ok(Self {
            core,
            receiver,
            local_addr,
            prober,
            destroyed: AtomicBool::new(false),
        })
    }

    /// Register `endpoint` locally, announce it, and notify local subscribers
    pub async fn register(&self, endpoint: &Endpoint) {
        self.core.directory.register(endpoint);
        self.do_register(endpoint).await;
        self.core.registered(endpoint).await;
    }

    /// Retract `endpoint` locally and remotely, and notify local subscribers
    pub async fn unregister(&self, endpoint: &Endpoint) {
        self.core.directory.unregister(endpoint);
        self.do_unregister(endpoint).await;
        self.core.unregistered(endpoint).await;
    }

    /// Subscribe `listener` to `key`
    ///
    /// In consumer role this waits (bounded by `subscribe_timeout`) for the
    /// provider's first reply, then notifies `listener` with whatever is
    /// known. An empty result after the wait means "nothing known yet".
    pub async fn subscribe(&self, key: &Endpoint, listener: Listener) {
        self.core.directory.subscribe(key, Arc::clone(&listener));
        self.do_subscribe(key).await;

        let endpoints = self.core.lookup(key);
        self.core.directory.notify(key, &listener, &endpoints);
    }

    /// Remove `listener` from `key` and drop the received cache for `key`
    pub async fn unsubscribe(&self, key: &Endpoint, listener: &Listener) {
        self.core.directory.unsubscribe(key, listener);
        self.do_unsubscribe(key).await;
        self.core.received.remove_key(key).await;
    }

    /// Send `register <endpoint>` to the peer
    pub async fn do_register(&self, endpoint: &Endpoint) {
        self.core.notice(Message::register(endpoint.clone())).await;
    }

    /// Send `unregister <endpoint>` to the peer
    pub async fn do_unregister(&self, endpoint: &Endpoint) {
        self.core.notice(Message::unregister(endpoint.clone())).await;
    }

    /// Send `subscribe <key>` and, as consumer, wait for a first reply
    ///
    /// A wildcard-interface key marks this registry as admin.
    pub async fn do_subscribe(&self, key: &Endpoint) {
        if key.service_interface() == Some(ANY_VALUE) {
            self.core.mark_admin();
        }

        let waiter = (self.core.connections.role() == Role::Consumer)
            .then(|| self.core.waiters.register(key));

        self.core.notice(Message::subscribe(key.clone())).await;

        if let Some(waiter) = waiter {
            if self.core.connections.writable().is_some() {
                let wait = tokio::time::timeout(self.core.config.subscribe_timeout, waiter.notified());
                if wait.await.is_err() {
                    self.core.stats.record_subscribe_timeout();
                    tracing::debug!(
                        key = %key,
                        timeout = ?self.core.config.subscribe_timeout,
                        "No subscribe reply before timeout"
                    );
                }
            }
            self.core.waiters.remove(key, &waiter);
        }
    }

    /// Send `unsubscribe <key>`
    ///
    /// A concrete key that was itself registered (`register` parameter not
    /// false) is unregistered first.
    pub async fn do_unsubscribe(&self, key: &Endpoint) {
        if key.service_interface() != Some(ANY_VALUE) && key.bool_parameter(REGISTER_KEY, true) {
            self.unregister(key).await;
        }
        self.core.notice(Message::unsubscribe(key.clone())).await;
    }

    /// Endpoints currently known for `key`
    pub fn lookup(&self, key: &Endpoint) -> Vec<Endpoint> {
        self.core.lookup(key)
    }

    /// Snapshot of the received set for exactly `key`
    pub async fn received(&self, key: &Endpoint) -> Vec<Endpoint> {
        self.core.received.get(key).await
    }

    /// Snapshot of every received set
    pub async fn received_all(&self) -> Vec<(Endpoint, Vec<Endpoint>)> {
        self.core.received.snapshot().await
    }

    /// Probe whether `endpoint` has gone away
    pub async fn is_expired(&self, endpoint: &Endpoint) -> bool {
        self.prober.is_expired(endpoint).await
    }

    /// Evict expired endpoints from every received set
    ///
    /// Only runs once this registry has issued a wildcard subscription.
    /// Each eviction is announced to the peer and applied locally. Returns
    /// the number of endpoints evicted.
    pub async fn clean(&self) -> usize {
        if !self.is_admin() {
            return 0;
        }

        let mut probed = HashSet::new();
        let mut evicted = 0;
        for (_, endpoints) in self.core.received.snapshot().await {
            for endpoint in endpoints {
                if !probed.insert(endpoint.clone()) {
                    continue;
                }
                if self.prober.is_expired(&endpoint).await {
                    tracing::warn!(endpoint = %endpoint, "Clean expired provider");
                    self.do_unregister(&endpoint).await;
                    self.core.unregistered(&endpoint).await;
                    self.core.stats.record_evicted();
                    evicted += 1;
                }
            }
        }
        evicted
    }

    /// Whether the role's socket is still open
    pub fn is_available(&self) -> bool {
        !self.destroyed.load(Ordering::Acquire) && self.core.connections.is_available()
    }

    /// Close the link and stop the receive loop; idempotent
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.core.connections.close().await;
        self.receiver.abort();

        tracing::info!(role = %self.role(), addr = %self.local_addr, "Standalone registry destroyed");
    }

    /// Whether a wildcard subscription has been issued
    pub fn is_admin(&self) -> bool {
        self.core.is_admin()
    }

    pub fn role(&self) -> Role {
        self.core.connections.role()
    }

    /// Provider: the bound listen address. Consumer: the provider's address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.core.config
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.core.directory
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.core.stats.snapshot()
    }
}

impl<D: Directory> Drop for StandaloneRegistry<D> {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}
