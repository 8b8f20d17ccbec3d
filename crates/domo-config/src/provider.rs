//! The provider capability implemented by bindings.

use crate::description::ConfigDescription;
use crate::registry::ProviderId;
use thiserror::Error;
use url::Url;

/// A source of configuration descriptions.
///
/// Implemented by each binding and registered with the
/// [`ConfigDescriptionRegistry`](crate::ConfigDescriptionRegistry). Providers
/// are treated as read-only capabilities at query time; a registered provider
/// may be queried from any thread at any moment.
///
/// Locale handling is the provider's responsibility: if a provider has no
/// description for the requested locale it decides itself whether to fall
/// back to another locale or report the description as absent. The registry
/// performs no locale fallback of its own.
pub trait ConfigDescriptionProvider: Send + Sync {
    /// Returns all descriptions this provider has for the given locale
    fn config_descriptions(&self, locale: Option<&str>) -> anyhow::Result<Vec<ConfigDescription>>;

    /// Returns the description for the given URI and locale.
    ///
    /// `Ok(None)` is a normal outcome, not an error.
    fn config_description(
        &self,
        uri: &Url,
        locale: Option<&str>,
    ) -> anyhow::Result<Option<ConfigDescription>>;
}

/// Record of one provider failing during an aggregate query.
///
/// Failures are collected and reported alongside the successful
/// contributions; they never abort the aggregate operation.
#[derive(Debug, Clone, Error)]
#[error("config description provider {provider_id} failed: {reason}")]
pub struct ProviderFailure {
    /// Handle of the failing provider
    pub provider_id: ProviderId,

    /// Rendered error message
    pub reason: String,
}
