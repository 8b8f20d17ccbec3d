//! The configuration-description model.
//!
//! A [`ConfigDescription`] is a read-only schema for the configurable
//! parameters of a device type or service, keyed by URI. Descriptions are
//! produced by providers and consumed as-is; consumers never mutate them.

use domo_core::types::DeviceTypeId;
use serde::{Deserialize, Serialize};
use url::Url;

/// Returns the conventional URI for a device type's configuration
/// description, e.g. `device-type:hue:bulb`.
pub fn device_type_uri(type_id: &DeviceTypeId) -> Url {
    // DeviceTypeId components cannot contain characters that are invalid in
    // an opaque URI path, so this cannot fail.
    Url::parse(&format!("device-type:{}", type_id))
        .expect("device type id forms a valid opaque URI")
}

/// Schema describing the configurable parameters of one device type or
/// service, keyed by URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDescription {
    /// URI identifying this description, e.g. `device-type:hue:bulb`
    pub uri: Url,

    /// Parameter definitions, in declaration order
    #[serde(default)]
    pub parameters: Vec<ConfigParameter>,

    /// Parameter group definitions
    #[serde(default)]
    pub groups: Vec<ParameterGroup>,
}

impl ConfigDescription {
    /// Creates an empty description for the given URI
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            parameters: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Adds a parameter definition
    pub fn with_parameter(mut self, parameter: ConfigParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Adds a parameter group definition
    pub fn with_group(mut self, group: ParameterGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Looks up a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&ConfigParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Data type of a configuration parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Free-form text
    Text,
    /// Whole number
    Integer,
    /// Decimal number
    Decimal,
    /// True/false flag
    Boolean,
}

/// One configurable parameter within a [`ConfigDescription`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigParameter {
    /// Parameter name (unique within its description)
    pub name: String,

    /// Data type
    pub parameter_type: ParameterType,

    /// Human-readable label
    pub label: Option<String>,

    /// Human-readable description
    pub description: Option<String>,

    /// Whether a value must be provided
    #[serde(default)]
    pub required: bool,

    /// Whether the parameter is read-only
    #[serde(default)]
    pub read_only: bool,

    /// Default value, serialized as text
    pub default: Option<String>,

    /// Name of the group this parameter belongs to
    pub group: Option<String>,

    /// Lower bound for numeric parameters
    pub minimum: Option<f64>,

    /// Upper bound for numeric parameters
    pub maximum: Option<f64>,

    /// Restricted set of allowed values
    #[serde(default)]
    pub options: Vec<ParameterOption>,
}

impl ConfigParameter {
    /// Creates a parameter with the given name and type
    pub fn new(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            label: None,
            description: None,
            required: false,
            read_only: false,
            default: None,
            group: None,
            minimum: None,
            maximum: None,
            options: Vec::new(),
        }
    }

    /// Sets the human-readable label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the parameter as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the parameter as read-only
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Sets the default value
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Assigns the parameter to a group
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets numeric bounds
    pub fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    /// Adds an allowed value option
    pub fn with_option(mut self, option: ParameterOption) -> Self {
        self.options.push(option);
        self
    }
}

/// Grouping of related parameters within a description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    /// Group name referenced by parameters
    pub name: String,

    /// Human-readable label
    pub label: Option<String>,

    /// Human-readable description
    pub description: Option<String>,
}

impl ParameterGroup {
    /// Creates a group with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            description: None,
        }
    }

    /// Sets the human-readable label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One allowed value for a restricted parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterOption {
    /// The value itself, serialized as text
    pub value: String,

    /// Human-readable label for the value
    pub label: String,
}

impl ParameterOption {
    /// Creates an option
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}
