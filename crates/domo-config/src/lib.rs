//! Configuration-description aggregation for the Domo platform.
//!
//! Every binding can describe the configurable parameters of its devices and
//! services as a [`ConfigDescription`] keyed by URI. This crate provides:
//!
//! - the description model (parameters, groups, options),
//! - the [`ConfigDescriptionProvider`] capability implemented by bindings,
//! - the [`ConfigDescriptionRegistry`], a single queryable surface over all
//!   registered providers with partial-failure tolerance: one misbehaving
//!   provider never blocks configuration lookup for the others.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use domo_config::{ConfigDescription, ConfigDescriptionProvider, ConfigDescriptionRegistry};
//! use url::Url;
//!
//! struct StaticProvider(ConfigDescription);
//!
//! impl ConfigDescriptionProvider for StaticProvider {
//!     fn config_descriptions(&self, _locale: Option<&str>) -> anyhow::Result<Vec<ConfigDescription>> {
//!         Ok(vec![self.0.clone()])
//!     }
//!
//!     fn config_description(&self, uri: &Url, _locale: Option<&str>) -> anyhow::Result<Option<ConfigDescription>> {
//!         Ok((self.0.uri == *uri).then(|| self.0.clone()))
//!     }
//! }
//!
//! let registry = ConfigDescriptionRegistry::new();
//! let uri = Url::parse("device-type:hue:bulb").unwrap();
//! registry.register(Arc::new(StaticProvider(ConfigDescription::new(uri.clone()))));
//!
//! assert!(registry.get(&uri, None).is_some());
//! ```

pub mod description;
pub mod provider;
pub mod registry;

pub use description::{
    device_type_uri, ConfigDescription, ConfigParameter, ParameterGroup, ParameterOption,
    ParameterType,
};
pub use provider::{ConfigDescriptionProvider, ProviderFailure};
pub use registry::{Aggregation, ConfigDescriptionRegistry, ProviderId};
