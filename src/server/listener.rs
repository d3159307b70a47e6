//! Provider side of the link
//!
//! Binds the registry address and serves one peer at a time: each accepted
//! connection becomes the current one and is read until it ends, then the
//! loop goes back to accept the next. The listener itself is only closed by
//! destroying the registry.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::directory::Directory;
use crate::registry::dispatch::RegistryCore;
use crate::registry::RegistryConfig;
use crate::session::Connection;

/// Bind the listening socket with the configured backlog
pub(crate) fn bind(config: &RegistryConfig) -> std::io::Result<TcpListener> {
    let socket = match config.address {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    socket.bind(config.address)?;
    socket.listen(config.backlog)
}

/// Accept and serve connections until the registry stops listening
pub(crate) async fn accept_loop<D: Directory>(core: Arc<RegistryCore<D>>, listener: TcpListener) {
    while core.connections.is_listening() {
        match listener.accept().await {
            Ok((socket, peer_addr)) => serve(&core, socket, peer_addr).await,
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept connection");
            }
        }
    }
    tracing::debug!("Accept loop stopped");
}

async fn serve<D: Directory>(core: &RegistryCore<D>, socket: TcpStream, peer_addr: SocketAddr) {
    core.stats.record_accepted();

    if core.config.tcp_nodelay {
        if let Err(e) = socket.set_nodelay(true) {
            tracing::warn!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
        }
    }

    let id = core.connections.next_connection_id();
    let (reader, writer) = socket.into_split();
    let connection = Arc::new(Connection::new(id, peer_addr, writer));
    core.connections.replace(Arc::clone(&connection)).await;

    tracing::info!(connection = id, peer = %peer_addr, "Registry peer connected");

    core.read_lines(reader, &connection).await;
    connection.close().await;

    tracing::info!(connection = id, peer = %peer_addr, "Registry peer disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let config = RegistryConfig::default()
            .address("127.0.0.1:0".parse().unwrap())
            .role(Role::Provider)
            .backlog(4);

        let listener = bind(&config).unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_fails() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = RegistryConfig::default().address(taken.local_addr().unwrap());

        // Another socket is listening without SO_REUSEPORT
        assert!(bind(&config).is_err());
    }
}
