//! Endpoint descriptor and its string form
//!
//! The canonical form is `protocol://host[:port][/path][?k=v&k2=v2]`.
//! Parameters are kept sorted so the full string of an endpoint is stable,
//! which matters because peers compare endpoints they parsed off the wire
//! against endpoints they built locally.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::protocol::constants::{
    ANYHOST_KEY, ANYHOST_VALUE, DYNAMIC_KEY, GROUP_KEY, INTERFACE_KEY, VERSION_KEY,
};

/// Addressable service instance plus metadata
///
/// Immutable once built; the `with_*` methods return a modified copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    protocol: String,
    host: String,
    port: u16,
    path: String,
    parameters: BTreeMap<String, String>,
}

impl Endpoint {
    /// Create an endpoint without parameters
    pub fn new(
        protocol: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            host: host.into(),
            port,
            path: path.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Return a copy with `key` set to `value`
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port, 0 when the endpoint has none
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Get a parameter, treating an empty value as absent
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Get a parameter or a default
    pub fn parameter_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.parameter(key).unwrap_or(default)
    }

    /// Get a boolean parameter; any value other than `true` reads as false
    pub fn bool_parameter(&self, key: &str, default: bool) -> bool {
        match self.parameter(key) {
            Some(value) => value.eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    /// Service interface: the `interface` parameter, falling back to the path
    pub fn service_interface(&self) -> Option<&str> {
        self.parameter(INTERFACE_KEY)
            .or_else(|| Some(self.path.as_str()).filter(|p| !p.is_empty()))
    }

    /// `group/interface:version`, omitting absent parts
    pub fn service_key(&self) -> String {
        let mut key = String::new();
        if let Some(group) = self.parameter(GROUP_KEY) {
            key.push_str(group);
            key.push('/');
        }
        key.push_str(self.service_interface().unwrap_or_default());
        if let Some(version) = self.parameter(VERSION_KEY) {
            key.push(':');
            key.push_str(version);
        }
        key
    }

    /// Whether the endpoint stands for "any local address"
    pub fn is_any_host(&self) -> bool {
        self.host == ANYHOST_VALUE || self.bool_parameter(ANYHOST_KEY, false)
    }

    /// Dynamic endpoints are announced at runtime and may go stale
    pub fn is_dynamic(&self) -> bool {
        self.bool_parameter(DYNAMIC_KEY, true)
    }

    /// Canonical wire form
    pub fn to_full_string(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.protocol, self.host)?;
        if self.port > 0 {
            write!(f, ":{}", self.port)?;
        }
        if !self.path.is_empty() {
            write!(f, "/{}", self.path)?;
        }
        let mut sep = '?';
        for (key, value) in &self.parameters {
            write!(f, "{}{}={}", sep, key, value)?;
            sep = '&';
        }
        Ok(())
    }
}

/// Endpoint string parse errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEndpointError {
    /// Input was empty or whitespace
    Empty,
    /// No `protocol://` prefix
    MissingProtocol,
    /// Nothing between `://` and the port/path
    MissingHost,
    /// Port is not a number in 0..=65535
    InvalidPort(String),
    /// Endpoint strings travel as single lines
    LineBreak,
}

impl std::fmt::Display for ParseEndpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseEndpointError::Empty => write!(f, "empty endpoint"),
            ParseEndpointError::MissingProtocol => write!(f, "missing protocol"),
            ParseEndpointError::MissingHost => write!(f, "missing host"),
            ParseEndpointError::InvalidPort(port) => write!(f, "invalid port: {}", port),
            ParseEndpointError::LineBreak => write!(f, "endpoint contains a line break"),
        }
    }
}

impl std::error::Error for ParseEndpointError {}

impl FromStr for Endpoint {
    type Err = ParseEndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseEndpointError::Empty);
        }
        if s.contains(&['\n', '\r'][..]) {
            return Err(ParseEndpointError::LineBreak);
        }

        let (protocol, rest) = s
            .split_once("://")
            .filter(|(p, _)| !p.is_empty())
            .ok_or(ParseEndpointError::MissingProtocol)?;

        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, query),
            None => (rest, ""),
        };
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ParseEndpointError::InvalidPort(port.to_string()))?;
                (host, port)
            }
            None => (authority, 0),
        };
        if host.is_empty() {
            return Err(ParseEndpointError::MissingHost);
        }

        let parameters = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Ok(Self {
            protocol: protocol.to_string(),
            host: host.to_string(),
            port,
            path: path.to_string(),
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let e: Endpoint = "service://10.0.0.1:20880/com.acme.Foo?version=1.0&dynamic=true"
            .parse()
            .unwrap();

        assert_eq!(e.protocol(), "service");
        assert_eq!(e.host(), "10.0.0.1");
        assert_eq!(e.port(), 20880);
        assert_eq!(e.path(), "com.acme.Foo");
        assert_eq!(e.parameter("version"), Some("1.0"));
        assert!(e.is_dynamic());
    }

    #[test]
    fn test_full_string_sorts_parameters() {
        let e: Endpoint = "service://10.0.0.1:20880/Foo?z=1&a=2".parse().unwrap();
        assert_eq!(e.to_full_string(), "service://10.0.0.1:20880/Foo?a=2&z=1");
    }

    #[test]
    fn test_wildcard_pattern_without_port() {
        let e: Endpoint = "service://*:0/Foo".parse().unwrap();
        assert_eq!(e.host(), "*");
        assert_eq!(e.port(), 0);
        assert_eq!(e.to_full_string(), "service://*/Foo");
        assert_eq!(e.to_full_string().parse::<Endpoint>().unwrap(), e);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Endpoint>(), Err(ParseEndpointError::Empty));
        assert_eq!(
            "10.0.0.1:80/Foo".parse::<Endpoint>(),
            Err(ParseEndpointError::MissingProtocol)
        );
        assert_eq!(
            "service://:80/Foo".parse::<Endpoint>(),
            Err(ParseEndpointError::MissingHost)
        );
        assert_eq!(
            "service://host:http/Foo".parse::<Endpoint>(),
            Err(ParseEndpointError::InvalidPort("http".into()))
        );
        assert_eq!(
            "service://host/Foo\nregister x".parse::<Endpoint>(),
            Err(ParseEndpointError::LineBreak)
        );
    }

    #[test]
    fn test_service_interface_prefers_parameter() {
        let e = Endpoint::new("service", "10.0.0.1", 1, "Foo").with_parameter("interface", "Bar");
        assert_eq!(e.service_interface(), Some("Bar"));

        let e = Endpoint::new("service", "10.0.0.1", 1, "");
        assert_eq!(e.service_interface(), None);
    }

    #[test]
    fn test_service_key() {
        let e = Endpoint::new("service", "10.0.0.1", 1, "Foo")
            .with_parameter("group", "g1")
            .with_parameter("version", "2.0");
        assert_eq!(e.service_key(), "g1/Foo:2.0");
        assert_eq!(Endpoint::new("service", "h", 1, "Foo").service_key(), "Foo");
    }

    #[test]
    fn test_bool_parameter() {
        let e = Endpoint::new("service", "h", 1, "Foo")
            .with_parameter("dynamic", "false")
            .with_parameter("flag", "TRUE")
            .with_parameter("empty", "");

        assert!(!e.is_dynamic());
        assert!(e.bool_parameter("flag", false));
        assert!(e.bool_parameter("empty", true));
        assert!(e.bool_parameter("missing", true));
    }

    #[test]
    fn test_any_host() {
        assert!(Endpoint::new("standalone", "0.0.0.0", 4234, "").is_any_host());
        assert!(Endpoint::new("standalone", "10.0.0.1", 4234, "")
            .with_parameter("anyhost", "true")
            .is_any_host());
        assert!(!Endpoint::new("standalone", "10.0.0.1", 4234, "").is_any_host());
    }
}
