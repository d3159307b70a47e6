//! Message dispatch and local notification
//!
//! [`RegistryCore`] is the state shared between the caller-facing
//! [`StandaloneRegistry`](super::StandaloneRegistry) and the background
//! receive loop. Inbound lines are decoded and applied here; outbound lines
//! are routed to whichever connection the current role can write to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::directory::Directory;
use crate::endpoint::{is_match, Endpoint};
use crate::protocol::constants::{ANY_VALUE, MAX_LINE_LENGTH};
use crate::protocol::{Message, Verb};
use crate::session::{Connection, ConnectionState};
use crate::stats::RegistryStats;

use super::config::RegistryConfig;
use super::received::ReceivedMap;
use super::waiters::SubscribeWaiters;

/// State shared by the caller side and the receive loop
pub(crate) struct RegistryCore<D: Directory> {
    pub(crate) config: RegistryConfig,
    pub(crate) directory: Arc<D>,
    pub(crate) received: ReceivedMap,
    pub(crate) connections: ConnectionState,
    pub(crate) stats: RegistryStats,
    pub(crate) waiters: SubscribeWaiters,
    /// Set once this instance has subscribed with a wildcard interface
    pub(crate) admin: AtomicBool,
}

impl<D: Directory> RegistryCore<D> {
    pub(crate) fn new(config: RegistryConfig, directory: Arc<D>, connections: ConnectionState) -> Self {
        Self {
            config,
            directory,
            received: ReceivedMap::new(),
            connections,
            stats: RegistryStats::new(),
            waiters: SubscribeWaiters::default(),
            admin: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_admin(&self) -> bool {
        self.admin.load(Ordering::Acquire)
    }

    pub(crate) fn mark_admin(&self) {
        self.admin.store(true, Ordering::Release);
    }

    /// Read lines from `reader` until end of stream, a read error, or the
    /// connection being closed from this side, dispatching each
    ///
    /// Lines that are not UTF-8 or exceed [`MAX_LINE_LENGTH`] are counted as
    /// ignored and skipped; only I/O errors end the loop.
    pub(crate) async fn read_lines<R>(&self, reader: R, connection: &Connection)
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        // Inside an oversized line, dropping chunks until its newline
        let mut skipping = false;

        loop {
            buf.clear();
            let mut limited = (&mut reader).take(MAX_LINE_LENGTH as u64 + 1);
            let read = tokio::select! {
                read = limited.read_until(b'\n', &mut buf) => read,
                _ = connection.closed() => {
                    tracing::debug!(
                        connection = connection.id(),
                        peer = %connection.peer_addr(),
                        "Connection closed, stop reading"
                    );
                    break;
                }
            };

            match read {
                Ok(0) => {
                    tracing::debug!(
                        connection = connection.id(),
                        peer = %connection.peer_addr(),
                        "Peer closed the link"
                    );
                    break;
                }
                Ok(_) => {
                    let complete = buf.last() == Some(&b'\n');
                    if skipping {
                        skipping = !complete;
                        continue;
                    }
                    if !complete && buf.len() > MAX_LINE_LENGTH {
                        self.stats.record_received();
                        self.stats.record_ignored();
                        tracing::debug!(
                            peer = %connection.peer_addr(),
                            limit = MAX_LINE_LENGTH,
                            "Ignoring oversized line"
                        );
                        skipping = true;
                        continue;
                    }
                    self.receive_raw(trim_line_end(&buf), connection).await;
                }
                Err(e) => {
                    tracing::warn!(
                        connection = connection.id(),
                        peer = %connection.peer_addr(),
                        error = %e,
                        "Read failed"
                    );
                    break;
                }
            }
        }
    }

    async fn receive_raw(&self, line: &[u8], connection: &Connection) {
        match std::str::from_utf8(line) {
            Ok(line) => self.receive(line, connection).await,
            Err(e) => {
                self.stats.record_received();
                self.stats.record_ignored();
                tracing::debug!(peer = %connection.peer_addr(), error = %e, "Ignoring non UTF-8 line");
            }
        }
    }

    /// Apply one inbound line received on `connection`
    pub(crate) async fn receive(&self, line: &str, connection: &Connection) {
        self.stats.record_received();
        tracing::debug!(peer = %connection.peer_addr(), line = line, "Received");

        let message = match Message::decode(line) {
            Ok(message) => message,
            Err(e) => {
                self.stats.record_ignored();
                tracing::debug!(peer = %connection.peer_addr(), error = %e, "Ignoring line");
                return;
            }
        };

        match message.verb {
            Verb::Register => self.registered(&message.endpoint).await,
            Verb::Unregister => self.unregistered(&message.endpoint).await,
            Verb::Subscribe => self.answer_subscribe(&message.endpoint, connection).await,
            Verb::Unsubscribe => {
                tracing::debug!(key = %message.endpoint, "Peer unsubscribed");
            }
        }
    }

    /// Add `endpoint` to every matching subscription and notify its listeners
    pub(crate) async fn registered(&self, endpoint: &Endpoint) {
        for (key, listeners) in self.directory.subscribed() {
            if !is_match(&key, endpoint) {
                continue;
            }
            let endpoints = self.received.add(&key, endpoint.clone()).await;
            for listener in &listeners {
                self.directory.notify(&key, listener, &endpoints);
            }
            self.waiters.release(&key);
        }
    }

    /// Remove `endpoint` from every matching subscription and notify its
    /// listeners, even when it was not present
    pub(crate) async fn unregistered(&self, endpoint: &Endpoint) {
        for (key, listeners) in self.directory.subscribed() {
            if !is_match(&key, endpoint) {
                continue;
            }
            let endpoints = self.received.remove(&key, endpoint).await;
            for listener in &listeners {
                self.directory.notify(&key, listener, &endpoints);
            }
        }
    }

    /// Stream locally registered matches of `pattern` back to the requester
    async fn answer_subscribe(&self, pattern: &Endpoint, connection: &Connection) {
        let lines: Vec<String> = self
            .directory
            .registered()
            .into_iter()
            .filter(|e| is_match(pattern, e))
            .map(|e| Message::register(e).encode())
            .collect();

        if lines.is_empty() {
            tracing::debug!(key = %pattern, "No registered endpoints match subscribe");
            return;
        }
        self.write_to(connection, &lines).await;
    }

    /// Send `message` on the connection usable for this role, or drop it
    pub(crate) async fn notice(&self, message: Message) {
        let line = message.encode();
        match self.connections.writable() {
            Some(connection) => self.write_to(&connection, std::slice::from_ref(&line)).await,
            None => {
                self.stats.record_dropped(1);
                tracing::debug!(
                    role = %self.connections.role(),
                    line = %line,
                    "No usable connection, message dropped"
                );
            }
        }
    }

    async fn write_to(&self, connection: &Connection, lines: &[String]) {
        match connection.send(lines).await {
            Ok(()) => {
                self.stats.record_sent(lines.len());
                for line in lines {
                    tracing::debug!(peer = %connection.peer_addr(), line = %line, "Sent");
                }
            }
            Err(e) => {
                self.stats.record_write_error();
                tracing::warn!(
                    connection = connection.id(),
                    peer = %connection.peer_addr(),
                    error = %e,
                    "Write failed, closing connection"
                );
                connection.close().await;
            }
        }
    }

    /// Endpoints known for `key`
    ///
    /// Tiers are tried in order and the first non-empty one wins: notified
    /// results, then the fallback cache, then a scan of local registrations.
    /// A wildcard-interface key additionally gets every matching
    /// subscription key.
    pub(crate) fn lookup(&self, key: &Endpoint) -> Vec<Endpoint> {
        let mut endpoints = self.directory.notified(key);
        if endpoints.is_empty() {
            endpoints = self.directory.cached(key);
        }
        if endpoints.is_empty() {
            endpoints = self
                .directory
                .registered()
                .into_iter()
                .filter(|e| is_match(key, e))
                .collect();
        }
        if key.service_interface() == Some(ANY_VALUE) {
            endpoints.extend(
                self.directory
                    .subscribed()
                    .into_iter()
                    .map(|(subscribed, _)| subscribed)
                    .filter(|subscribed| is_match(key, subscribed)),
            );
        }
        endpoints
    }
}

/// Strip a trailing `\n` or `\r\n`
fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
