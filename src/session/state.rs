//! Role-tagged connection state
//!
//! Holds at most one usable connection. The provider replaces it every time
//! it accepts; the consumer sets it once at construction and never again.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::connection::Connection;

/// Which side of the link this registry plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Listens and accepts replacement connections
    Provider,
    /// Holds one outbound connection for its lifetime
    Consumer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Provider => write!(f, "provider"),
            Role::Consumer => write!(f, "consumer"),
        }
    }
}

/// Current connection for one registry instance
#[derive(Debug)]
pub struct ConnectionState {
    role: Role,
    /// Provider only: the listening socket is still accepting
    listening: AtomicBool,
    current: RwLock<Option<Arc<Connection>>>,
    next_id: AtomicU64,
}

impl ConnectionState {
    /// State for a provider whose listener has just been bound
    pub fn provider() -> Self {
        Self {
            role: Role::Provider,
            listening: AtomicBool::new(true),
            current: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// State for a consumer holding its single outbound connection
    pub fn consumer(connection: Arc<Connection>) -> Self {
        Self {
            role: Role::Consumer,
            listening: AtomicBool::new(false),
            next_id: AtomicU64::new(connection.id() + 1),
            current: RwLock::new(Some(connection)),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Allocate an id for a newly accepted connection
    pub fn next_connection_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Install `connection` as current, closing the one it supersedes
    pub async fn replace(&self, connection: Arc<Connection>) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(connection);

        if let Some(previous) = previous {
            if previous.is_open() {
                tracing::debug!(
                    connection = previous.id(),
                    peer = %previous.peer_addr(),
                    "Closing superseded connection"
                );
                previous.close().await;
            }
        }
    }

    /// Current connection, open or not
    pub fn current(&self) -> Option<Arc<Connection>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Connection to write to, if any is usable for this role
    pub fn writable(&self) -> Option<Arc<Connection>> {
        if self.role == Role::Provider && !self.is_listening() {
            return None;
        }
        self.current().filter(|c| c.is_open())
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Provider: listener still open. Consumer: its connection still open.
    pub fn is_available(&self) -> bool {
        match self.role {
            Role::Provider => self.is_listening(),
            Role::Consumer => self.current().is_some_and(|c| c.is_open()),
        }
    }

    /// Mark the listener closed and shut down the current connection
    pub async fn close(&self) {
        self.listening.store(false, Ordering::Release);
        if let Some(connection) = self.current() {
            connection.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn connection(id: u64) -> (Arc<Connection>, tokio::io::DuplexStream) {
        let addr: SocketAddr = "127.0.0.1:4234".parse().unwrap();
        let (local, remote) = tokio::io::duplex(64);
        (Arc::new(Connection::new(id, addr, local)), remote)
    }

    #[tokio::test]
    async fn test_provider_replace_closes_previous() {
        let state = ConnectionState::provider();
        assert!(state.is_available());
        assert!(state.writable().is_none());

        let (first, _r1) = connection(state.next_connection_id());
        state.replace(Arc::clone(&first)).await;
        assert_eq!(state.writable().unwrap().id(), first.id());

        let (second, _r2) = connection(state.next_connection_id());
        state.replace(Arc::clone(&second)).await;

        assert!(!first.is_open());
        assert_eq!(state.writable().unwrap().id(), second.id());
    }

    #[tokio::test]
    async fn test_provider_close() {
        let state = ConnectionState::provider();
        let (conn, _remote) = connection(1);
        state.replace(Arc::clone(&conn)).await;

        state.close().await;

        assert!(!state.is_available());
        assert!(!conn.is_open());
        assert!(state.writable().is_none());
    }

    #[tokio::test]
    async fn test_consumer_availability_follows_connection() {
        let (conn, _remote) = connection(1);
        let state = ConnectionState::consumer(Arc::clone(&conn));
        assert_eq!(state.role(), Role::Consumer);
        assert!(state.is_available());
        assert!(state.writable().is_some());

        conn.close().await;

        assert!(!state.is_available());
        assert!(state.writable().is_none());
    }
}
