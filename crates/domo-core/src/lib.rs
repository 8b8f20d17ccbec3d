//! # Domo Core
//!
//! Core types for the Domo smart-home discovery and configuration engine.
//!
//! This crate provides the foundational building blocks shared by the rest of
//! the system:
//!
//! - **Identifiers**: typed, validated identifiers for device types, device
//!   instances, and firmwares (`DeviceTypeId`, `DeviceInstanceId`,
//!   `FirmwareId`). All identifiers are immutable value objects with
//!   structural equality and a lossless `<bindingId>:<typeName>[:<segment>]`
//!   string form.
//! - **Errors**: `ValidationError` for identifier construction failures,
//!   raised at construction time so no invalid identifier can ever exist.
//! - **Configuration**: serde-backed configuration for the discovery engine
//!   (`DiscoveryConfig`, `ScannerConfig`) with per-field defaults and
//!   validation. Defined here so the discovery crate can re-export it
//!   without a circular dependency.
//!
//! ## Example
//!
//! ```
//! use domo_core::types::{DeviceTypeId, DeviceInstanceId};
//!
//! let type_id = DeviceTypeId::new("hue", "bulb").unwrap();
//! let instance = DeviceInstanceId::new(type_id, "00178823").unwrap();
//! assert_eq!(instance.to_string(), "hue:bulb:00178823");
//!
//! // The string form round-trips through the validating parser.
//! let parsed: DeviceInstanceId = "hue:bulb:00178823".parse().unwrap();
//! assert_eq!(parsed, instance);
//! ```

pub mod discovery_config;
pub mod error;
pub mod types;

// Re-export commonly used types for convenience
pub use discovery_config::{DiscoveryConfig, ScannerConfig};
pub use error::ValidationError;
pub use types::{DeviceInstanceId, DeviceTypeId, FirmwareId};
