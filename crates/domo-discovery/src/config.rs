//! Configuration types for the discovery engine
//!
//! Re-exports configuration from domo-core to avoid circular dependencies

pub use domo_core::discovery_config::{DiscoveryConfig, ScannerConfig};
