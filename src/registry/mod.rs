//! Standalone registry
//!
//! The registry holds one link to its peer and keeps, per subscription key,
//! the endpoints the peer has announced.
//!
//! # Architecture
//!
//! ```text
//!          caller                                 receive loop task
//!   register/subscribe/...                  (accept_loop | read_loop)
//!            │                                          │
//!            ▼                                          ▼
//!   ┌──────────────────┐    notice()     ┌────────────────────────────┐
//!   │ StandaloneRegistry├───────────────►│ ConnectionState::writable() │──► TCP
//!   └────────┬─────────┘                 └────────────────────────────┘
//!            │                                          │ receive(line)
//!            ▼                                          ▼
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │ RegistryCore: ReceivedMap, SubscribeWaiters, RegistryStats        │
//!   │   registered()/unregistered() ──► Directory::notify ──► listeners │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub(crate) mod dispatch;
pub mod received;
pub mod standalone;
mod waiters;

pub use config::RegistryConfig;
pub use received::ReceivedMap;
pub use standalone::StandaloneRegistry;
