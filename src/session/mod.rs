//! Connection handling shared by both roles

pub mod connection;
pub mod state;

pub use connection::Connection;
pub use state::{ConnectionState, Role};
