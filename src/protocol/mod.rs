//! Wire protocol
//!
//! ```text
//! Consumer                                  Provider
//!   |                                          |
//!   |------- subscribe <pattern> ------------->|
//!   |<------ register <endpoint> --------------|  (one per match)
//!   |                                          |
//!   |<------ register / unregister <endpoint> -|  (later changes)
//!   |------- unsubscribe <pattern> ----------->|
//! ```
//!
//! Either side may send any verb; the roles only decide who listens and who
//! connects.

pub mod constants;
pub mod message;

pub use message::{Message, Verb};
