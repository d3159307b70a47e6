//! Statistics for the registry link

pub mod metrics;

pub use metrics::{RegistryStats, StatsSnapshot};
