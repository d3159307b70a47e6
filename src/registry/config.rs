//! Registry configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use crate::protocol::constants::*;
use crate::session::Role;

/// Default bound on the consumer's wait for a first subscribe reply
pub const DEFAULT_SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause between the two liveness probe attempts
pub const DEFAULT_PROBE_BACKOFF: Duration = Duration::from_millis(100);

/// Bound on a single liveness probe connect
pub const DEFAULT_PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Registry configuration options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Address the provider binds to, or the consumer connects to
    pub address: SocketAddr,

    /// Listening or connecting side
    pub role: Role,

    /// How long a consumer subscribe waits for the first reply
    pub subscribe_timeout: Duration,

    /// Delay before the second liveness probe attempt
    pub probe_backoff: Duration,

    /// Timeout for each liveness probe connect
    pub probe_connect_timeout: Duration,

    /// Listen backlog (provider only)
    pub backlog: u32,

    /// Enable TCP_NODELAY on the link
    pub tcp_nodelay: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            role: Role::Consumer,
            subscribe_timeout: DEFAULT_SUBSCRIBE_TIMEOUT,
            probe_backoff: DEFAULT_PROBE_BACKOFF,
            probe_connect_timeout: DEFAULT_PROBE_CONNECT_TIMEOUT,
            backlog: DEFAULT_BACKLOG,
            // Lines are tiny and latency-sensitive
            tcp_nodelay: true,
        }
    }
}

impl Role {
    /// `server` selects the provider; anything else, including absence,
    /// selects the consumer
    pub fn from_parameter(value: Option<&str>) -> Self {
        match value {
            Some(SERVER_ROLE) => Role::Provider,
            _ => Role::Consumer,
        }
    }
}

impl RegistryConfig {
    /// Build a config from a registry endpoint such as
    /// `standalone://10.0.0.1:4234?role=server`
    ///
    /// The host must be a literal dotted IPv4 address and not the wildcard
    /// address. A port of 0 means [`DEFAULT_PORT`]. `timeout` (milliseconds)
    /// and `backlog` override the defaults.
    pub fn from_endpoint(endpoint: &Endpoint) -> Result<Self, ConfigError> {
        if endpoint.is_any_host() {
            return Err(ConfigError::AnyHost);
        }

        let host = endpoint.host();
        if host.split('.').count() != 4 {
            return Err(ConfigError::InvalidAddress(host.to_string()));
        }
        let ip: Ipv4Addr = host
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(host.to_string()))?;

        let port = match endpoint.port() {
            0 => DEFAULT_PORT,
            port => port,
        };

        let mut config = Self {
            address: SocketAddr::from((ip, port)),
            role: Role::from_parameter(endpoint.parameter(ROLE_KEY)),
            ..Self::default()
        };

        if let Some(ms) = numeric_parameter(endpoint, TIMEOUT_KEY)? {
            config.subscribe_timeout = Duration::from_millis(ms);
        }
        if let Some(backlog) = numeric_parameter(endpoint, BACKLOG_KEY)? {
            config.backlog = u32::try_from(backlog).map_err(|_| ConfigError::InvalidParameter {
                key: BACKLOG_KEY.to_string(),
                value: backlog.to_string(),
            })?;
        }

        Ok(config)
    }

    /// Parse a registry URL and build a config from it
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let endpoint: Endpoint = url.parse()?;
        Self::from_endpoint(&endpoint)
    }

    /// Set the address
    pub fn address(mut self, addr: SocketAddr) -> Self {
        self.address = addr;
        self
    }

    /// Set the role
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the subscribe wait bound
    pub fn subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = timeout;
        self
    }

    /// Set the delay between probe attempts
    pub fn probe_backoff(mut self, backoff: Duration) -> Self {
        self.probe_backoff = backoff;
        self
    }

    /// Set the per-attempt probe timeout
    pub fn probe_connect_timeout(mut self, timeout: Duration) -> Self {
        self.probe_connect_timeout = timeout;
        self
    }

    /// Set the listen backlog
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }
}

fn numeric_parameter(endpoint: &Endpoint, key: &str) -> Result<Option<u64>, ConfigError> {
    endpoint
        .parameter(key)
        .map(|value| {
            value.parse::<u64>().map_err(|_| ConfigError::InvalidParameter {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.address.port(), DEFAULT_PORT);
        assert_eq!(config.role, Role::Consumer);
        assert_eq!(config.subscribe_timeout, DEFAULT_SUBSCRIBE_TIMEOUT);
        assert_eq!(config.probe_backoff, Duration::from_millis(100));
        assert_eq!(config.backlog, 50);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_from_url_provider() {
        let config = assert_ok!(RegistryConfig::from_url(
            "standalone://10.0.0.1:9000?role=server"
        ));

        assert_eq!(config.address, "10.0.0.1:9000".parse().unwrap());
        assert_eq!(config.role, Role::Provider);
    }

    #[test]
    fn test_from_url_defaults_port_and_role() {
        let config = assert_ok!(RegistryConfig::from_url("standalone://10.0.0.1"));

        assert_eq!(config.address.port(), 4234);
        assert_eq!(config.role, Role::Consumer);

        let config = assert_ok!(RegistryConfig::from_url(
            "standalone://10.0.0.1:0?role=client"
        ));
        assert_eq!(config.address.port(), 4234);
        assert_eq!(config.role, Role::Consumer);
    }

    #[test]
    fn test_from_url_rejects_bad_hosts() {
        assert_eq!(
            assert_err!(RegistryConfig::from_url("standalone://0.0.0.0:4234")),
            ConfigError::AnyHost
        );
        assert_eq!(
            assert_err!(RegistryConfig::from_url("standalone://registry.local:4234")),
            ConfigError::InvalidAddress("registry.local".into())
        );
        assert_eq!(
            assert_err!(RegistryConfig::from_url("standalone://10.0.0.300:4234")),
            ConfigError::InvalidAddress("10.0.0.300".into())
        );
        assert!(matches!(
            RegistryConfig::from_url("not a url"),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_from_url_parameters() {
        let config = assert_ok!(RegistryConfig::from_url(
            "standalone://127.0.0.1:4234?timeout=250&backlog=8"
        ));
        assert_eq!(config.subscribe_timeout, Duration::from_millis(250));
        assert_eq!(config.backlog, 8);

        assert_eq!(
            assert_err!(RegistryConfig::from_url("standalone://127.0.0.1?timeout=soon")),
            ConfigError::InvalidParameter {
                key: "timeout".into(),
                value: "soon".into()
            }
        );
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let config = RegistryConfig::default()
            .address(addr)
            .role(Role::Provider)
            .subscribe_timeout(Duration::from_millis(20))
            .probe_backoff(Duration::from_millis(5))
            .probe_connect_timeout(Duration::from_millis(50))
            .backlog(4);

        assert_eq!(config.address, addr);
        assert_eq!(config.role, Role::Provider);
        assert_eq!(config.subscribe_timeout, Duration::from_millis(20));
        assert_eq!(config.probe_backoff, Duration::from_millis(5));
        assert_eq!(config.probe_connect_timeout, Duration::from_millis(50));
        assert_eq!(config.backlog, 4);
    }
}
