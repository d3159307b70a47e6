//! Liveness probe for registered endpoints
//!
//! An endpoint is considered expired only after two failed connects to its
//! `host:port`, the second one after a short backoff. Descriptors that do
//! not stand for a listening provider are never probed.

use std::time::Duration;

use tokio::net::TcpStream;

use crate::endpoint::Endpoint;
use crate::protocol::constants::{CONSUMER_PROTOCOL, OVERRIDE_PROTOCOL, ROUTE_PROTOCOL};
use crate::registry::RegistryConfig;

/// Connect-twice liveness prober
#[derive(Debug, Clone)]
pub struct ExpirationProber {
    backoff: Duration,
    connect_timeout: Duration,
}

impl ExpirationProber {
    pub fn new(backoff: Duration, connect_timeout: Duration) -> Self {
        Self {
            backoff,
            connect_timeout,
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.probe_backoff, config.probe_connect_timeout)
    }

    /// Whether `endpoint` is exempt from liveness checks
    pub fn is_exempt(endpoint: &Endpoint) -> bool {
        !endpoint.is_dynamic()
            || endpoint.port() == 0
            || matches!(
                endpoint.protocol(),
                CONSUMER_PROTOCOL | ROUTE_PROTOCOL | OVERRIDE_PROTOCOL
            )
    }

    /// Probe `endpoint`; `true` means both connect attempts failed
    pub async fn is_expired(&self, endpoint: &Endpoint) -> bool {
        if Self::is_exempt(endpoint) {
            return false;
        }

        if self.try_connect(endpoint).await {
            return false;
        }

        tokio::time::sleep(self.backoff).await;

        let alive = self.try_connect(endpoint).await;
        if !alive {
            tracing::debug!(endpoint = %endpoint, "Endpoint unreachable after retry");
        }
        !alive
    }

    async fn try_connect(&self, endpoint: &Endpoint) -> bool {
        let addr = (endpoint.host(), endpoint.port());
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            // Dropping the stream closes the probe connection
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::trace!(endpoint = %endpoint, error = %e, "Probe connect failed");
                false
            }
            Err(_) => {
                tracing::trace!(endpoint = %endpoint, "Probe connect timed out");
                false
            }
        }
    }
}

impl Default for ExpirationProber {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::net::TcpListener;

    fn prober() -> ExpirationProber {
        ExpirationProber::new(Duration::from_millis(50), Duration::from_secs(1))
    }

    /// Port on loopback with nothing listening
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_exemptions() {
        let e: Endpoint = "service://10.0.0.1:20880/Foo?dynamic=false".parse().unwrap();
        assert!(ExpirationProber::is_exempt(&e));

        let e: Endpoint = "service://10.0.0.1/Foo".parse().unwrap();
        assert!(ExpirationProber::is_exempt(&e));

        for protocol in ["consumer", "route", "override"] {
            let e = Endpoint::new(protocol, "10.0.0.1", 20880, "Foo");
            assert!(ExpirationProber::is_exempt(&e));
        }

        let e: Endpoint = "service://10.0.0.1:20880/Foo".parse().unwrap();
        assert!(!ExpirationProber::is_exempt(&e));
    }

    #[tokio::test]
    async fn test_non_dynamic_never_expires() {
        let port = closed_port().await;
        let e = Endpoint::new("service", "127.0.0.1", port, "Foo").with_parameter("dynamic", "false");

        assert!(!prober().is_expired(&e).await);
    }

    #[tokio::test]
    async fn test_reachable_is_alive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let e = Endpoint::new("service", "127.0.0.1", port, "Foo");

        assert!(!prober().is_expired(&e).await);
    }

    #[tokio::test]
    async fn test_unreachable_expires_after_backoff() {
        let port = closed_port().await;
        let e = Endpoint::new("service", "127.0.0.1", port, "Foo");

        let started = Instant::now();
        assert!(prober().is_expired(&e).await);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
