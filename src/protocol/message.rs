//! Line codec
//!
//! Every message is one UTF-8 line: `<verb> <endpoint full string>`. There is
//! no escaping, length prefix or version field; an endpoint string can never
//! contain a line break, so a newline is a sufficient frame delimiter.

use crate::endpoint::Endpoint;
use crate::error::ProtocolError;

use super::constants::{REGISTER, SUBSCRIBE, UNREGISTER, UNSUBSCRIBE};

/// Message verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Announce an endpoint as live
    Register,
    /// Retract a previously announced endpoint
    Unregister,
    /// Ask for current and future matches of a pattern
    Subscribe,
    /// Cancel a subscription
    Unsubscribe,
}

impl Verb {
    /// Decode order. `unregister` is tried after `register` and cannot be
    /// mistaken for it since neither is a prefix of the other.
    pub const ALL: [Verb; 4] = [
        Verb::Register,
        Verb::Unregister,
        Verb::Subscribe,
        Verb::Unsubscribe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Register => REGISTER,
            Verb::Unregister => UNREGISTER,
            Verb::Subscribe => SUBSCRIBE,
            Verb::Unsubscribe => UNSUBSCRIBE,
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded protocol line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub verb: Verb,
    pub endpoint: Endpoint,
}

impl Message {
    pub fn new(verb: Verb, endpoint: Endpoint) -> Self {
        Self { verb, endpoint }
    }

    pub fn register(endpoint: Endpoint) -> Self {
        Self::new(Verb::Register, endpoint)
    }

    pub fn unregister(endpoint: Endpoint) -> Self {
        Self::new(Verb::Unregister, endpoint)
    }

    pub fn subscribe(endpoint: Endpoint) -> Self {
        Self::new(Verb::Subscribe, endpoint)
    }

    pub fn unsubscribe(endpoint: Endpoint) -> Self {
        Self::new(Verb::Unsubscribe, endpoint)
    }

    /// Encode as a line, without the trailing newline
    pub fn encode(&self) -> String {
        format!("{} {}", self.verb, self.endpoint.to_full_string())
    }

    /// Decode a line (with or without its trailing newline)
    ///
    /// The verb is matched as a prefix; whatever follows it is trimmed and
    /// parsed as an endpoint.
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let (verb, payload) = Verb::ALL
            .iter()
            .find_map(|verb| line.strip_prefix(verb.as_str()).map(|rest| (*verb, rest)))
            .ok_or_else(|| ProtocolError::UnknownVerb(line.to_string()))?;

        let endpoint = payload.trim().parse::<Endpoint>()?;
        Ok(Self { verb, endpoint })
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.verb, self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::ParseEndpointError;

    #[test]
    fn test_encode() {
        let e: Endpoint = "service://10.0.0.1:20880/Foo?dynamic=true".parse().unwrap();

        assert_eq!(
            Message::register(e.clone()).encode(),
            "register service://10.0.0.1:20880/Foo?dynamic=true"
        );
        assert_eq!(
            Message::unsubscribe(e).encode(),
            "unsubscribe service://10.0.0.1:20880/Foo?dynamic=true"
        );
    }

    #[test]
    fn test_decode_each_verb() {
        for verb in Verb::ALL {
            let line = format!("{} service://10.0.0.1:20880/Foo\n", verb);
            let msg = Message::decode(&line).unwrap();
            assert_eq!(msg.verb, verb);
            assert_eq!(msg.endpoint.path(), "Foo");
        }
    }

    #[test]
    fn test_decode_trims_payload() {
        let msg = Message::decode("register    service://h:1/Foo   ").unwrap();
        assert_eq!(msg.endpoint, Endpoint::new("service", "h", 1, "Foo"));
    }

    #[test]
    fn test_decode_unknown_verb() {
        assert!(matches!(
            Message::decode("hello service://h:1/Foo"),
            Err(ProtocolError::UnknownVerb(_))
        ));
        assert!(matches!(Message::decode(""), Err(ProtocolError::UnknownVerb(_))));
    }

    #[test]
    fn test_decode_missing_payload() {
        assert_eq!(
            Message::decode("subscribe"),
            Err(ProtocolError::MalformedEndpoint(ParseEndpointError::Empty))
        );
    }
}
