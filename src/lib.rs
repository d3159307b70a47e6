//! Point-to-point service registry
//!
//! For RPC deployments without a multicast discovery channel: one process
//! runs the registry as a provider (listening) and another as a consumer
//! (connecting), and the two exchange newline-delimited
//! `register`/`unregister`/`subscribe`/`unsubscribe` lines over a single TCP
//! link.
//!
//! - [`StandaloneRegistry`] owns the link and the receive loop
//! - [`Directory`] is the seam to whoever owns canonical registration state;
//!   [`MemoryDirectory`] is the in-process implementation
//! - [`ExpirationProber`] checks whether a registered endpoint is still
//!   reachable
//!
//! There is no reconnection: a consumer whose link drops reports
//! `is_available() == false` until it is rebuilt.

mod client;
pub mod directory;
pub mod endpoint;
pub mod error;
pub mod probe;
pub mod protocol;
pub mod registry;
mod server;
pub mod session;
pub mod stats;

pub use directory::{Directory, Listener, MemoryDirectory, NotifyListener};
pub use endpoint::{is_match, Endpoint, ParseEndpointError};
pub use error::{ConfigError, Error, ProtocolError, Result};
pub use probe::ExpirationProber;
pub use registry::{RegistryConfig, StandaloneRegistry};
pub use session::Role;
pub use stats::StatsSnapshot;
