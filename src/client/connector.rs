//! Consumer side of the link
//!
//! One outbound connection for the lifetime of the registry. When it ends,
//! the consumer stays disconnected; rebuilding the registry is the only way
//! back.

use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;

use crate::directory::Directory;
use crate::registry::dispatch::RegistryCore;
use crate::registry::RegistryConfig;
use crate::session::Connection;

/// Connect to the provider, returning the read half and the write side
pub(crate) async fn connect(config: &RegistryConfig) -> std::io::Result<(OwnedReadHalf, Connection)> {
    let stream = TcpStream::connect(config.address).await?;
    if config.tcp_nodelay {
        stream.set_nodelay(true)?;
    }
    let peer_addr = stream.peer_addr()?;
    let (reader, writer) = stream.into_split();

    tracing::info!(peer = %peer_addr, "Connected to registry provider");

    Ok((reader, Connection::new(1, peer_addr, writer)))
}

/// Read from the provider until the link ends, then close it for good
pub(crate) async fn read_loop<D: Directory>(
    core: Arc<RegistryCore<D>>,
    reader: OwnedReadHalf,
    connection: Arc<Connection>,
) {
    core.read_lines(reader, &connection).await;
    connection.close().await;

    tracing::info!(
        peer = %connection.peer_addr(),
        "Registry link lost, consumer will not reconnect"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused() {
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let config = RegistryConfig::default().address(addr);

        let err = connect(&config).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused);
    }

    #[tokio::test]
    async fn test_connect_reports_peer() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = RegistryConfig::default().address(addr);

        let (_reader, connection) = connect(&config).await.unwrap();
        assert_eq!(connection.peer_addr(), addr);
        assert!(connection.is_open());
    }
}
