//! A single registry link
//!
//! The read half is owned by the receive loop; the write half lives here
//! behind an async mutex so that lines from concurrent callers (and replies
//! written by the receive loop) never interleave on the wire.
//! Closing wakes the receive loop through [`Connection::closed`] so it stops
//! reading from a link it can no longer answer on.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Notify};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Write side of one registry link
pub struct Connection {
    id: u64,
    peer_addr: SocketAddr,
    writer: Mutex<Option<BoxedWriter>>,
    open: AtomicBool,
    closed: Notify,
}

impl Connection {
    /// Wrap the write half of a link
    pub fn new<W>(id: u64, peer_addr: SocketAddr, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            id,
            peer_addr,
            writer: Mutex::new(Some(Box::new(writer))),
            open: AtomicBool::new(true),
            closed: Notify::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Resolves once the connection has been closed from this side
    pub async fn closed(&self) {
        loop {
            // Registered before the flag check so a concurrent close is not missed
            let notified = self.closed.notified();
            if !self.is_open() {
                return;
            }
            notified.await;
        }
    }

    /// Write `lines`, each terminated by `\n`, as one batch and flush
    pub async fn send(&self, lines: &[String]) -> std::io::Result<()> {
        let mut buf = BytesMut::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            buf.put_slice(line.as_bytes());
            buf.put_u8(b'\n');
        }

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "connection closed")
        })?;
        writer.write_all(&buf).await?;
        writer.flush().await
    }

    /// Shut down the write half; idempotent
    pub async fn close(&self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        self.closed.notify_waiters();
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(
                    connection = self.id,
                    peer = %self.peer_addr,
                    error = %e,
                    "Shutdown failed"
                );
            }
        }
        tracing::debug!(connection = self.id, peer = %self.peer_addr, "Connection closed");
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("open", &self.is_open())
            .finish()
    }
}
