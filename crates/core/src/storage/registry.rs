//! Adapters built once at start-up, keyed by provider.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use stowage_shared::StorageSettings;
use tracing::{info, warn};

use super::adapter::{OpendalAdapter, StorageAdapter};
use super::config::{ProviderConfig, StorageTimings};
use super::error::ConfigurationError;
use super::reference::ProviderId;

/// Immutable set of provider adapters.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<ProviderId, Arc<dyn StorageAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an adapter, replacing any adapter registered for the same provider.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn StorageAdapter>) -> Self {
        self.adapters.insert(adapter.provider(), adapter);
        self
    }

    /// Builds adapters for every provider that has configuration.
    ///
    /// Adapters are built regardless of the upload mode so references
    /// written under an earlier mode can still be resolved. Providers whose
    /// configuration is unusable are left out and reported.
    #[must_use]
    pub fn from_settings(
        settings: &StorageSettings,
        timings: &StorageTimings,
    ) -> (Self, Vec<ConfigurationError>) {
        let mut registry = Self::new();
        let mut diagnostics = Vec::new();

        for provider in ProviderId::ALL {
            let Some(config) = provider_config(provider, settings) else {
                continue;
            };

            match config.and_then(|config| {
                OpendalAdapter::new(provider, config, timings.presign_ttl)
            }) {
                Ok(adapter) => {
                    registry = registry.with_adapter(Arc::new(adapter));
                }
                Err(e) => {
                    warn!(provider = %provider, error = %e, "Storage provider disabled");
                    diagnostics.push(e);
                }
            }
        }

        info!(
            providers = ?registry.providers().collect::<Vec<_>>(),
            "Storage adapters ready"
        );

        (registry, diagnostics)
    }

    /// Adapter for a provider.
    #[must_use]
    pub fn get(&self, provider: ProviderId) -> Option<&Arc<dyn StorageAdapter>> {
        self.adapters.get(&provider)
    }

    /// Registered providers in priority order.
    pub fn providers(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.adapters.keys().copied()
    }

    /// Whether no adapter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Adapters for the requested providers, in the requested order.
    ///
    /// Providers without an adapter are dropped and reported.
    #[must_use]
    pub fn select(
        &self,
        providers: &[ProviderId],
    ) -> (Vec<Arc<dyn StorageAdapter>>, Vec<ConfigurationError>) {
        let mut selected = Vec::with_capacity(providers.len());
        let mut missing = Vec::new();

        for &provider in providers {
            match self.adapters.get(&provider) {
                Some(adapter) => selected.push(Arc::clone(adapter)),
                None => {
                    warn!(provider = %provider, "Storage provider selected but not configured");
                    missing.push(ConfigurationError::ProviderNotConfigured(provider));
                }
            }
        }

        (selected, missing)
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("providers", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Provider configuration, `None` when the provider is not configured at all.
///
/// The primary slot uses S3 when a bucket is set and falls back to a local
/// directory. The secondary slot is Azure Blob Storage, keyed by container.
fn provider_config(
    provider: ProviderId,
    settings: &StorageSettings,
) -> Option<Result<ProviderConfig, ConfigurationError>> {
    match provider {
        ProviderId::Primary => {
            if let Some(s3) = settings.s3.as_ref().filter(|s3| is_set(s3.bucket.as_deref())) {
                return Some(ProviderConfig::from_s3_settings(provider, s3));
            }
            settings
                .local_root
                .as_deref()
                .filter(|root| !root.is_empty())
                .map(|root| Ok(ProviderConfig::local_fs(PathBuf::from(root))))
        }
        ProviderId::Secondary => settings
            .azure
            .as_ref()
            .filter(|azure| is_set(azure.container.as_deref()))
            .map(|azure| ProviderConfig::from_azure_settings(provider, azure)),
    }
}

fn is_set(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::FakeAdapter;
    use stowage_shared::{AzureSettings, S3Settings};

    #[test]
    fn test_select_keeps_requested_order() {
        let registry = AdapterRegistry::new()
            .with_adapter(FakeAdapter::new(ProviderId::Primary).shared())
            .with_adapter(FakeAdapter::new(ProviderId::Secondary).shared());

        let (selected, missing) =
            registry.select(&[ProviderId::Secondary, ProviderId::Primary]);
        let order: Vec<_> = selected.iter().map(|a| a.provider()).collect();
        assert_eq!(order, vec![ProviderId::Secondary, ProviderId::Primary]);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_select_drops_unconfigured_provider() {
        let registry =
            AdapterRegistry::new().with_adapter(FakeAdapter::new(ProviderId::Primary).shared());

        let (selected, missing) =
            registry.select(&[ProviderId::Primary, ProviderId::Secondary]);
        assert_eq!(selected.len(), 1);
        assert_eq!(
            missing,
            vec![ConfigurationError::ProviderNotConfigured(
                ProviderId::Secondary
            )]
        );
    }

    #[tokio::test]
    async fn test_from_settings_local_primary() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StorageSettings {
            local_root: Some(dir.path().to_string_lossy().into_owned()),
            ..StorageSettings::default()
        };

        let (registry, diagnostics) =
            AdapterRegistry::from_settings(&settings, &StorageTimings::default());
        assert!(diagnostics.is_empty());
        assert_eq!(
            registry.providers().collect::<Vec<_>>(),
            vec![ProviderId::Primary]
        );
    }

    #[tokio::test]
    async fn test_from_settings_reports_unusable_provider() {
        let settings = StorageSettings {
            s3: Some(S3Settings {
                bucket: Some("recordings".to_string()),
                access_key_id: Some("AKIA".to_string()),
                ..S3Settings::default()
            }),
            azure: Some(AzureSettings {
                container: Some("recordings".to_string()),
                ..AzureSettings::default()
            }),
            ..StorageSettings::default()
        };

        let (registry, diagnostics) =
            AdapterRegistry::from_settings(&settings, &StorageTimings::default());
        assert!(registry.is_empty());
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn test_unconfigured_providers_are_skipped() {
        let settings = StorageSettings {
            s3: Some(S3Settings {
                region: Some("eu-west-1".to_string()),
                ..S3Settings::default()
            }),
            ..StorageSettings::default()
        };
        assert!(provider_config(ProviderId::Primary, &settings).is_none());
        assert!(provider_config(ProviderId::Secondary, &settings).is_none());
    }
}
