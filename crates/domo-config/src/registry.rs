//! Registry aggregating descriptions from all registered providers.

use crate::description::ConfigDescription;
use crate::provider::{ConfigDescriptionProvider, ProviderFailure};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Handle identifying a registered provider.
///
/// Returned by [`ConfigDescriptionRegistry::register`] and required to
/// unregister the provider again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(Uuid);

impl ProviderId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of an aggregate [`ConfigDescriptionRegistry::all`] query
#[derive(Debug, Default)]
pub struct Aggregation {
    /// Union of all successful providers' descriptions
    pub descriptions: Vec<ConfigDescription>,

    /// Providers that failed during this query
    pub failures: Vec<ProviderFailure>,
}

struct RegisteredProvider {
    id: ProviderId,
    provider: Arc<dyn ConfigDescriptionProvider>,
}

/// Single queryable surface over all registered description providers.
///
/// Providers may register and unregister at any time; the registry holds no
/// provider-derived state, so changes take effect on the next query without
/// any cache invalidation. Queries snapshot the provider list and then run
/// without holding the lock, so a slow provider never blocks registration.
#[derive(Default)]
pub struct ConfigDescriptionRegistry {
    providers: RwLock<Vec<RegisteredProvider>>,
}

impl ConfigDescriptionRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider and returns its handle
    pub fn register(&self, provider: Arc<dyn ConfigDescriptionProvider>) -> ProviderId {
        let id = ProviderId::new();
        self.providers
            .write()
            .push(RegisteredProvider { id, provider });
        debug!(provider_id = %id, "Config description provider registered");
        id
    }

    /// Unregisters a provider. Returns false if the handle is unknown.
    pub fn unregister(&self, id: ProviderId) -> bool {
        let mut providers = self.providers.write();
        let before = providers.len();
        providers.retain(|p| p.id != id);
        let removed = providers.len() != before;
        if removed {
            debug!(provider_id = %id, "Config description provider unregistered");
        }
        removed
    }

    /// Returns the number of registered providers
    pub fn provider_count(&self) -> usize {
        self.providers.read().len()
    }

    /// Queries every provider and returns the union of their descriptions.
    ///
    /// A failing provider is skipped: its contribution is dropped for this
    /// query, the failure is recorded in the returned [`Aggregation`] and
    /// logged, and aggregation of the remaining providers continues.
    pub fn all(&self, locale: Option<&str>) -> Aggregation {
        let snapshot = self.snapshot();
        let mut aggregation = Aggregation::default();

        for (id, provider) in snapshot {
            match provider.config_descriptions(locale) {
                Ok(mut descriptions) => aggregation.descriptions.append(&mut descriptions),
                Err(e) => {
                    warn!(provider_id = %id, error = %e, "Config description provider failed; skipping");
                    aggregation.failures.push(ProviderFailure {
                        provider_id: id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        aggregation
    }

    /// Returns the first non-absent match for the URI, querying providers in
    /// registration order.
    ///
    /// A provider that errors is treated as having no match so it cannot
    /// shadow later providers. `None` means no provider had a description
    /// for the URI; that is a normal outcome, not an error.
    pub fn get(&self, uri: &Url, locale: Option<&str>) -> Option<ConfigDescription> {
        for (id, provider) in self.snapshot() {
            match provider.config_description(uri, locale) {
                Ok(Some(description)) => return Some(description),
                Ok(None) => {}
                Err(e) => {
                    warn!(provider_id = %id, uri = %uri, error = %e, "Config description provider failed; treating as absent");
                }
            }
        }
        None
    }

    fn snapshot(&self) -> Vec<(ProviderId, Arc<dyn ConfigDescriptionProvider>)> {
        self.providers
            .read()
            .iter()
            .map(|p| (p.id, Arc::clone(&p.provider)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::{ConfigParameter, ParameterType};
    use anyhow::anyhow;

    struct StaticProvider {
        descriptions: Vec<ConfigDescription>,
    }

    impl StaticProvider {
        fn single(uri: &str) -> Self {
            Self {
                descriptions: vec![ConfigDescription::new(Url::parse(uri).unwrap())],
            }
        }
    }

    impl ConfigDescriptionProvider for StaticProvider {
        fn config_descriptions(&self, _locale: Option<&str>) -> anyhow::Result<Vec<ConfigDescription>> {
            Ok(self.descriptions.clone())
        }

        fn config_description(
            &self,
            uri: &Url,
            _locale: Option<&str>,
        ) -> anyhow::Result<Option<ConfigDescription>> {
            Ok(self.descriptions.iter().find(|d| d.uri == *uri).cloned())
        }
    }

    struct FailingProvider;

    impl ConfigDescriptionProvider for FailingProvider {
        fn config_descriptions(&self, _locale: Option<&str>) -> anyhow::Result<Vec<ConfigDescription>> {
            Err(anyhow!("backend unavailable"))
        }

        fn config_description(
            &self,
            _uri: &Url,
            _locale: Option<&str>,
        ) -> anyhow::Result<Option<ConfigDescription>> {
            Err(anyhow!("backend unavailable"))
        }
    }

    #[test]
    fn test_all_aggregates_across_providers() {
        let registry = ConfigDescriptionRegistry::new();
        registry.register(Arc::new(StaticProvider::single("device-type:hue:bulb")));
        registry.register(Arc::new(StaticProvider::single("device-type:zwave:dimmer")));

        let aggregation = registry.all(None);
        assert_eq!(aggregation.descriptions.len(), 2);
        assert!(aggregation.failures.is_empty());
    }

    #[test]
    fn test_failing_provider_is_skipped_not_fatal() {
        let registry = ConfigDescriptionRegistry::new();
        registry.register(Arc::new(StaticProvider::single("device-type:hue:bulb")));
        let failing = registry.register(Arc::new(FailingProvider));
        registry.register(Arc::new(StaticProvider::single("device-type:zwave:dimmer")));

        let aggregation = registry.all(None);
        assert_eq!(aggregation.descriptions.len(), 2);
        assert_eq!(aggregation.failures.len(), 1);
        assert_eq!(aggregation.failures[0].provider_id, failing);
        assert!(aggregation.failures[0].reason.contains("backend unavailable"));
    }

    #[test]
    fn test_get_respects_registration_order() {
        let uri = Url::parse("device-type:hue:bulb").unwrap();

        let first = ConfigDescription::new(uri.clone())
            .with_parameter(ConfigParameter::new("host", ParameterType::Text));
        let second = ConfigDescription::new(uri.clone());

        let registry = ConfigDescriptionRegistry::new();
        registry.register(Arc::new(StaticProvider {
            descriptions: vec![first.clone()],
        }));
        registry.register(Arc::new(StaticProvider {
            descriptions: vec![second],
        }));

        let found = registry.get(&uri, None).unwrap();
        assert_eq!(found, first);
    }

    #[test]
    fn test_get_skips_failing_provider() {
        let uri = Url::parse("device-type:hue:bulb").unwrap();

        let registry = ConfigDescriptionRegistry::new();
        registry.register(Arc::new(FailingProvider));
        registry.register(Arc::new(StaticProvider::single("device-type:hue:bulb")));

        assert!(registry.get(&uri, None).is_some());
    }

    #[test]
    fn test_get_absent_is_none() {
        let registry = ConfigDescriptionRegistry::new();
        registry.register(Arc::new(StaticProvider::single("device-type:hue:bulb")));

        let missing = Url::parse("device-type:hue:unknown").unwrap();
        assert!(registry.get(&missing, None).is_none());
    }

    #[test]
    fn test_unregister_takes_effect_immediately() {
        let registry = ConfigDescriptionRegistry::new();
        let id = registry.register(Arc::new(StaticProvider::single("device-type:hue:bulb")));
        assert_eq!(registry.all(None).descriptions.len(), 1);

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.all(None).descriptions.is_empty());
        assert_eq!(registry.provider_count(), 0);
    }
}
