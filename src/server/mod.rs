//! Provider role: listening socket and accept loop

pub(crate) mod listener;
