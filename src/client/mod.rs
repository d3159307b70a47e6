//! Consumer role: single outbound connection

pub(crate) mod connector;
