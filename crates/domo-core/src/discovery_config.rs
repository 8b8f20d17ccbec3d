//! Configuration types for the discovery engine.
//!
//! Lives in the core crate so `domo-discovery` can re-export it without a
//! circular dependency.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine-wide configuration for the discovery coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Default scan timeout applied to scanners without their own (seconds)
    #[serde(default = "default_scan_timeout")]
    pub default_scan_timeout_secs: u64,

    /// How often to sweep the result table for expired entries (seconds)
    #[serde(default = "default_sweep_interval")]
    pub expiry_sweep_interval_secs: u64,

    /// Capacity of the broadcast event channel
    #[serde(default = "default_event_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            default_scan_timeout_secs: default_scan_timeout(),
            expiry_sweep_interval_secs: default_sweep_interval(),
            event_channel_capacity: default_event_capacity(),
        }
    }
}

impl DiscoveryConfig {
    /// Returns the default scan timeout as a Duration
    pub fn default_scan_timeout(&self) -> Duration {
        Duration::from_secs(self.default_scan_timeout_secs)
    }

    /// Returns the expiry sweep interval as a Duration
    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_interval_secs)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_scan_timeout_secs == 0 {
            return Err("default_scan_timeout_secs cannot be 0".to_string());
        }

        if self.expiry_sweep_interval_secs == 0 {
            return Err("expiry_sweep_interval_secs cannot be 0".to_string());
        }

        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity cannot be 0".to_string());
        }

        Ok(())
    }
}

fn default_scan_timeout() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_event_capacity() -> usize {
    1000
}

/// Per-scanner configuration applied when registering a scanner
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScannerConfig {
    /// Scan timeout (seconds); falls back to the engine default when unset
    #[serde(default)]
    pub scan_timeout_secs: Option<u64>,

    /// Interval for background re-triggered scans (seconds); disabled when
    /// unset
    #[serde(default)]
    pub background_interval_secs: Option<u64>,
}

impl ScannerConfig {
    /// Creates a configuration with an explicit scan timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            scan_timeout_secs: Some(timeout.as_secs()),
            background_interval_secs: None,
        }
    }

    /// Enables background re-triggered scans on the given interval
    pub fn with_background_interval(mut self, interval: Duration) -> Self {
        self.background_interval_secs = Some(interval.as_secs());
        self
    }

    /// Returns the effective scan timeout given the engine default
    pub fn scan_timeout(&self, fallback: Duration) -> Duration {
        self.scan_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(fallback)
    }

    /// Returns the background interval, if configured
    pub fn background_interval(&self) -> Option<Duration> {
        self.background_interval_secs.map(Duration::from_secs)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.scan_timeout_secs == Some(0) {
            return Err("scan_timeout_secs cannot be 0".to_string());
        }

        if self.background_interval_secs == Some(0) {
            return Err("background_interval_secs cannot be 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DiscoveryConfig::default().validate().is_ok());
        assert!(ScannerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = DiscoveryConfig {
            expiry_sweep_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ScannerConfig {
            scan_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_fallback() {
        let fallback = Duration::from_secs(60);
        assert_eq!(ScannerConfig::default().scan_timeout(fallback), fallback);

        let config = ScannerConfig::with_timeout(Duration::from_secs(5));
        assert_eq!(config.scan_timeout(fallback), Duration::from_secs(5));
    }
}
