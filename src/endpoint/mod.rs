//! Endpoint descriptors
//!
//! An [`Endpoint`] names a service instance (or, used as a subscription key,
//! a pattern over instances). [`is_match`] decides whether a pattern covers a
//! concrete endpoint.

pub mod matcher;
pub mod url;

pub use matcher::{is_match, is_match_category};
pub use url::{Endpoint, ParseEndpointError};
