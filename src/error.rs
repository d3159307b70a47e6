//! Error types
//!
//! Construction failures surface as [`Error`]. Everything that goes wrong
//! after construction (socket reads, writes, bad lines from the peer) is
//! logged and swallowed by the receive loop instead.

use crate::endpoint::ParseEndpointError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket bind/connect or other I/O failure
    Io(std::io::Error),
    /// Invalid registry configuration
    Config(ConfigError),
    /// Line received from the peer could not be decoded
    Protocol(ProtocolError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Protocol(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

/// Registry configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Registry address is the wildcard host
    AnyHost,
    /// Host is not a literal IPv4 address
    InvalidAddress(String),
    /// Registry URL could not be parsed
    InvalidEndpoint(ParseEndpointError),
    /// A numeric parameter had a non-numeric value
    InvalidParameter { key: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::AnyHost => write!(f, "Registry address cannot be the wildcard host"),
            ConfigError::InvalidAddress(host) => write!(f, "Invalid ip address {}", host),
            ConfigError::InvalidEndpoint(e) => write!(f, "Invalid registry url: {}", e),
            ConfigError::InvalidParameter { key, value } => {
                write!(f, "Invalid value for parameter {}: {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ParseEndpointError> for ConfigError {
    fn from(e: ParseEndpointError) -> Self {
        ConfigError::InvalidEndpoint(e)
    }
}

/// Line decoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Line does not start with a known verb
    UnknownVerb(String),
    /// Payload is not a valid endpoint string
    MalformedEndpoint(ParseEndpointError),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::UnknownVerb(line) => write!(f, "Unknown verb in line: {}", line),
            ProtocolError::MalformedEndpoint(e) => write!(f, "Malformed endpoint: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<ParseEndpointError> for ProtocolError {
    fn from(e: ParseEndpointError) -> Self {
        ProtocolError::MalformedEndpoint(e)
    }
}
