//! Discovery results reported by scanners.

use chrono::{DateTime, Utc};
use domo_core::types::DeviceInstanceId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Time-to-live of a discovery result.
///
/// After the TTL elapses without the device being re-discovered, the result
/// is considered stale and swept from the coordinator's result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultTtl {
    /// Never expires
    Forever,
    /// Expires after the given number of seconds
    Seconds(u64),
}

impl ResultTtl {
    /// Returns the TTL as a duration, or `None` for [`ResultTtl::Forever`]
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            ResultTtl::Forever => None,
            ResultTtl::Seconds(secs) => Some(Duration::from_secs(*secs)),
        }
    }
}

/// One candidate device reported by a scanner.
///
/// Immutable once created: a device that is discovered again is superseded
/// by a newer result with the same [`DeviceInstanceId`], never mutated in
/// place. The instance ID is the deduplication key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// Identifier of the discovered device instance
    pub instance_id: DeviceInstanceId,

    /// Human-readable label
    pub label: String,

    /// Properties declared by the scanner (host, serial, firmware, ...)
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,

    /// Name of the property that uniquely represents the device, if any
    pub representation_property: Option<String>,

    /// Time-to-live of this result
    #[serde(default = "default_ttl")]
    pub ttl: ResultTtl,

    /// When the result was created
    pub created_at: DateTime<Utc>,
}

fn default_ttl() -> ResultTtl {
    ResultTtl::Forever
}

impl DiscoveryResult {
    /// Starts building a result for the given device instance
    pub fn builder(instance_id: DeviceInstanceId) -> DiscoveryResultBuilder {
        DiscoveryResultBuilder::new(instance_id)
    }

    /// Returns a property value as text, if present and textual
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(|v| v.as_str())
    }
}

/// Builder for [`DiscoveryResult`]
pub struct DiscoveryResultBuilder {
    instance_id: DeviceInstanceId,
    label: Option<String>,
    properties: HashMap<String, serde_json::Value>,
    representation_property: Option<String>,
    ttl: ResultTtl,
}

impl DiscoveryResultBuilder {
    /// Creates a builder for the given device instance
    pub fn new(instance_id: DeviceInstanceId) -> Self {
        Self {
            instance_id,
            label: None,
            properties: HashMap::new(),
            representation_property: None,
            ttl: default_ttl(),
        }
    }

    /// Sets the human-readable label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Adds a declared property
    pub fn property(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Sets the representation property name
    pub fn representation_property(mut self, name: impl Into<String>) -> Self {
        self.representation_property = Some(name.into());
        self
    }

    /// Sets the time-to-live
    pub fn ttl(mut self, ttl: ResultTtl) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the time-to-live in seconds
    pub fn ttl_seconds(self, secs: u64) -> Self {
        self.ttl(ResultTtl::Seconds(secs))
    }

    /// Builds the result. The label defaults to the instance ID's string
    /// form when none was set.
    pub fn build(self) -> DiscoveryResult {
        let label = self.label.unwrap_or_else(|| self.instance_id.to_string());
        DiscoveryResult {
            instance_id: self.instance_id,
            label,
            properties: self.properties,
            representation_property: self.representation_property,
            ttl: self.ttl,
            created_at: Utc::now(),
        }
    }
}
