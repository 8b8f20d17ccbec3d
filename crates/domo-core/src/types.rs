//! Typed identifiers for device types, device instances, and firmwares.
//!
//! All identifiers share the same serialized shape,
//! `<bindingId>:<typeName>[:<segment>]`, with `:` reserved as the separator.
//! Components are validated at construction; parsing goes through the same
//! validating path, so `parse(x.to_string()) == x` holds for every
//! identifier that exists.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The reserved separator character used in serialized identifiers
pub const SEPARATOR: char = ':';

fn validate_component(component: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyComponent { component });
    }
    if value.contains(SEPARATOR) {
        return Err(ValidationError::ReservedSeparator {
            component,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Identifier for a device type contributed by a binding.
///
/// Consists of the binding identifier and the type name within that binding,
/// e.g. `hue:bulb`. Created once at binding registration and never mutated.
///
/// # Examples
///
/// ```
/// use domo_core::types::DeviceTypeId;
///
/// let id = DeviceTypeId::new("hue", "bulb").unwrap();
/// assert_eq!(id.to_string(), "hue:bulb");
/// assert!(DeviceTypeId::new("hue", "").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceTypeId {
    binding_id: String,
    type_name: String,
}

impl DeviceTypeId {
    /// Creates a new device type identifier.
    ///
    /// Fails if either component is empty or contains the reserved `:`
    /// separator.
    pub fn new(
        binding_id: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let binding_id = binding_id.into();
        let type_name = type_name.into();
        validate_component("binding id", &binding_id)?;
        validate_component("type name", &type_name)?;
        Ok(Self {
            binding_id,
            type_name,
        })
    }

    /// Returns the binding identifier
    pub fn binding_id(&self) -> &str {
        &self.binding_id
    }

    /// Returns the type name within the binding
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl fmt::Display for DeviceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.binding_id, SEPARATOR, self.type_name)
    }
}

impl FromStr for DeviceTypeId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, SEPARATOR);
        match (parts.next(), parts.next()) {
            (Some(binding), Some(type_name)) => Self::new(binding, type_name),
            _ => Err(ValidationError::Malformed {
                value: s.to_string(),
                expected: "<bindingId>:<typeName>",
            }),
        }
    }
}

impl TryFrom<String> for DeviceTypeId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceTypeId> for String {
    fn from(id: DeviceTypeId) -> Self {
        id.to_string()
    }
}

/// Identifier for one concrete device instance.
///
/// Combines a [`DeviceTypeId`] with an instance-specific segment (serial
/// number, dSID, MAC, ...), e.g. `hue:bulb:00178823`. This is the
/// deduplication key for discovery results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceInstanceId {
    type_id: DeviceTypeId,
    instance: String,
}

impl DeviceInstanceId {
    /// Creates a new device instance identifier.
    ///
    /// Fails if the instance segment is empty or contains the reserved `:`
    /// separator.
    pub fn new(
        type_id: DeviceTypeId,
        instance: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let instance = instance.into();
        validate_component("instance segment", &instance)?;
        Ok(Self { type_id, instance })
    }

    /// Returns the device type this instance belongs to
    pub fn type_id(&self) -> &DeviceTypeId {
        &self.type_id
    }

    /// Returns the instance-specific segment
    pub fn instance(&self) -> &str {
        &self.instance
    }
}

impl fmt::Display for DeviceInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.type_id, SEPARATOR, self.instance)
    }
}

impl FromStr for DeviceInstanceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(binding), Some(type_name), Some(instance)) => {
                Self::new(DeviceTypeId::new(binding, type_name)?, instance)
            }
            _ => Err(ValidationError::Malformed {
                value: s.to_string(),
                expected: "<bindingId>:<typeName>:<instance>",
            }),
        }
    }
}

impl TryFrom<String> for DeviceInstanceId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceInstanceId> for String {
    fn from(id: DeviceInstanceId) -> Self {
        id.to_string()
    }
}

/// Identifier for a firmware image of one device type.
///
/// Combines a [`DeviceTypeId`] with a version string, e.g.
/// `hue:bulb:1.93.7`. The version must not contain the `:` separator so the
/// serialized form stays unambiguous. Two firmware identifiers are equal iff
/// both components are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FirmwareId {
    type_id: DeviceTypeId,
    version: String,
}

impl FirmwareId {
    /// Creates a new firmware identifier.
    ///
    /// Fails if the version is empty or contains the reserved `:` separator.
    pub fn new(type_id: DeviceTypeId, version: impl Into<String>) -> Result<Self, ValidationError> {
        let version = version.into();
        validate_component("firmware version", &version)?;
        Ok(Self { type_id, version })
    }

    /// Returns the device type this firmware applies to
    pub fn type_id(&self) -> &DeviceTypeId {
        &self.type_id
    }

    /// Returns the firmware version
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for FirmwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.type_id, SEPARATOR, self.version)
    }
}

impl FromStr for FirmwareId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(binding), Some(type_name), Some(version)) => {
                Self::new(DeviceTypeId::new(binding, type_name)?, version)
            }
            _ => Err(ValidationError::Malformed {
                value: s.to_string(),
                expected: "<bindingId>:<typeName>:<version>",
            }),
        }
    }
}

impl TryFrom<String> for FirmwareId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FirmwareId> for String {
    fn from(id: FirmwareId) -> Self {
        id.to_string()
    }
}
