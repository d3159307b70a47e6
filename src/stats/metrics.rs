//! Counters for the registry link
//!
//! Dropped writes and ignored lines never surface as errors, so
//! they are counted here to stay observable.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the caller side and the receive loop
#[derive(Debug, Default)]
pub struct RegistryStats {
    lines_received: AtomicU64,
    lines_ignored: AtomicU64,
    lines_sent: AtomicU64,
    writes_dropped: AtomicU64,
    write_errors: AtomicU64,
    connections_accepted: AtomicU64,
    subscribe_timeouts: AtomicU64,
    endpoints_evicted: AtomicU64,
}

impl RegistryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ignored(&self) {
        self.lines_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self, lines: usize) {
        self.lines_sent.fetch_add(lines as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self, lines: usize) {
        self.writes_dropped.fetch_add(lines as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_subscribe_timeout(&self) {
        self.subscribe_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self) {
        self.endpoints_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            lines_ignored: self.lines_ignored.load(Ordering::Relaxed),
            lines_sent: self.lines_sent.load(Ordering::Relaxed),
            writes_dropped: self.writes_dropped.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            subscribe_timeouts: self.subscribe_timeouts.load(Ordering::Relaxed),
            endpoints_evicted: self.endpoints_evicted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RegistryStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Lines read off the link
    pub lines_received: u64,
    /// Lines with an unknown verb or malformed endpoint
    pub lines_ignored: u64,
    /// Lines written to the link
    pub lines_sent: u64,
    /// Lines dropped because no connection was usable
    pub writes_dropped: u64,
    /// Writes that failed and closed the connection
    pub write_errors: u64,
    /// Inbound connections accepted (provider role)
    pub connections_accepted: u64,
    /// Subscribe waits that ran out before any reply
    pub subscribe_timeouts: u64,
    /// Endpoints removed by cleanup
    pub endpoints_evicted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = RegistryStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_stats_record() {
        let stats = RegistryStats::new();

        stats.record_received();
        stats.record_received();
        stats.record_ignored();
        stats.record_sent(3);
        stats.record_dropped(2);
        stats.record_write_error();
        stats.record_accepted();
        stats.record_subscribe_timeout();
        stats.record_evicted();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.lines_received, 2);
        assert_eq!(snapshot.lines_ignored, 1);
        assert_eq!(snapshot.lines_sent, 3);
        assert_eq!(snapshot.writes_dropped, 2);
        assert_eq!(snapshot.write_errors, 1);
        assert_eq!(snapshot.connections_accepted, 1);
        assert_eq!(snapshot.subscribe_timeouts, 1);
        assert_eq!(snapshot.endpoints_evicted, 1);
    }
}
