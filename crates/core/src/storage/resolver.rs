//! Ordered fallback chain from stored references to an access URL.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use super::error::ResolutionError;
use super::reference::{AccessUrl, ProviderId, ProviderOutcomes};
use super::registry::AdapterRegistry;

/// Result of resolving an artifact's access URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccessUrlResult {
    /// A provider produced a URL.
    Resolved {
        /// Provider that answered.
        provider: ProviderId,
        /// The URL.
        url: AccessUrl,
    },
    /// No provider could produce a URL.
    Unavailable,
}

impl AccessUrlResult {
    /// The URL, if resolved.
    #[must_use]
    pub fn url(&self) -> Option<&AccessUrl> {
        match self {
            Self::Resolved { url, .. } => Some(url),
            Self::Unavailable => None,
        }
    }
}

/// Walks providers in priority order until one yields a URL.
///
/// Providers without a stored reference are skipped without being called.
/// There are no retries within one call.
#[derive(Debug, Clone)]
pub struct AccessUrlResolver {
    registry: AdapterRegistry,
    priority: Vec<ProviderId>,
    timeout: Duration,
}

impl AccessUrlResolver {
    /// Creates a resolver over the given adapters and priority order.
    #[must_use]
    pub fn new(registry: AdapterRegistry, priority: Vec<ProviderId>, timeout: Duration) -> Self {
        Self {
            registry,
            priority,
            timeout,
        }
    }

    /// Resolves a URL from the stored outcomes.
    pub async fn resolve(&self, outcomes: &ProviderOutcomes) -> AccessUrlResult {
        for &provider in &self.priority {
            let Some(reference) = outcomes.reference(provider) else {
                continue;
            };
            let Some(adapter) = self.registry.get(provider) else {
                warn!(provider = %provider, "Reference stored for a provider with no adapter, skipping");
                continue;
            };

            let result = tokio::time::timeout(
                self.timeout,
                adapter.resolve_access_url(&reference.location),
            )
            .await
            .unwrap_or(Err(ResolutionError::Timeout(self.timeout)));

            match result {
                Ok(url) => {
                    debug!(provider = %provider, location = %reference.location, "Access URL resolved");
                    return AccessUrlResult::Resolved { provider, url };
                }
                Err(e) => {
                    warn!(
                        provider = %provider,
                        location = %reference.location,
                        error = %e,
                        "Access URL resolution failed, trying next provider"
                    );
                }
            }
        }

        AccessUrlResult::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::{FakeAdapter, ResolveBehavior};
    use std::sync::Arc;

    const KEY: &str = "recordings/0190.mp4";

    fn resolver(primary: &Arc<FakeAdapter>, secondary: &Arc<FakeAdapter>) -> AccessUrlResolver {
        AccessUrlResolver::new(
            AdapterRegistry::new()
                .with_adapter(primary.clone())
                .with_adapter(secondary.clone()),
            vec![ProviderId::Primary, ProviderId::Secondary],
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_primary_preferred() {
        let primary = FakeAdapter::new(ProviderId::Primary).shared();
        let secondary = FakeAdapter::new(ProviderId::Secondary).shared();
        let mut outcomes = ProviderOutcomes::new();
        outcomes.record_success(primary.reference(KEY));
        outcomes.record_success(secondary.reference(KEY));

        let result = resolver(&primary, &secondary).resolve(&outcomes).await;

        assert!(matches!(
            result,
            AccessUrlResult::Resolved { provider: ProviderId::Primary, .. }
        ));
        assert_eq!(secondary.resolve_calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_without_reference_is_not_called() {
        let primary = FakeAdapter::new(ProviderId::Primary).shared();
        let secondary = FakeAdapter::new(ProviderId::Secondary).shared();
        let mut outcomes = ProviderOutcomes::new();
        outcomes.record_failure(ProviderId::Primary, "denied");
        outcomes.record_success(secondary.reference(KEY));

        let result = resolver(&primary, &secondary).resolve(&outcomes).await;

        assert_eq!(
            result.url().map(|u| u.url.as_str()),
            Some(FakeAdapter::url_for(ProviderId::Secondary, KEY).as_str())
        );
        assert_eq!(primary.resolve_calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_on_resolution_error() {
        let primary = FakeAdapter::new(ProviderId::Primary)
            .with_resolve(ResolveBehavior::Fail(ResolutionError::not_found(KEY)))
            .shared();
        let secondary = FakeAdapter::new(ProviderId::Secondary).shared();
        let mut outcomes = ProviderOutcomes::new();
        outcomes.record_success(primary.reference(KEY));
        outcomes.record_success(secondary.reference(KEY));

        let result = resolver(&primary, &secondary).resolve(&outcomes).await;

        assert!(matches!(
            result,
            AccessUrlResult::Resolved { provider: ProviderId::Secondary, .. }
        ));
        assert_eq!(primary.resolve_calls(), 1);
    }

    #[tokio::test]
    async fn test_hung_resolution_falls_back() {
        let primary = FakeAdapter::new(ProviderId::Primary)
            .with_resolve(ResolveBehavior::Hang)
            .shared();
        let secondary = FakeAdapter::new(ProviderId::Secondary).shared();
        let mut outcomes = ProviderOutcomes::new();
        outcomes.record_success(primary.reference(KEY));
        outcomes.record_success(secondary.reference(KEY));

        let result = resolver(&primary, &secondary).resolve(&outcomes).await;

        assert!(matches!(
            result,
            AccessUrlResult::Resolved { provider: ProviderId::Secondary, .. }
        ));
    }

    #[tokio::test]
    async fn test_no_references_is_unavailable() {
        let primary = FakeAdapter::new(ProviderId::Primary).shared();
        let secondary = FakeAdapter::new(ProviderId::Secondary).shared();

        let result = resolver(&primary, &secondary)
            .resolve(&ProviderOutcomes::new())
            .await;

        assert_eq!(result, AccessUrlResult::Unavailable);
        assert_eq!(primary.resolve_calls() + secondary.resolve_calls(), 0);
    }

    #[tokio::test]
    async fn test_all_providers_failing_is_unavailable() {
        let primary = FakeAdapter::new(ProviderId::Primary)
            .with_resolve(ResolveBehavior::Fail(ResolutionError::Denied("expired".into())))
            .shared();
        let secondary = FakeAdapter::new(ProviderId::Secondary)
            .with_resolve(ResolveBehavior::Fail(ResolutionError::not_found(KEY)))
            .shared();
        let mut outcomes = ProviderOutcomes::new();
        outcomes.record_success(primary.reference(KEY));
        outcomes.record_success(secondary.reference(KEY));

        let result = resolver(&primary, &secondary).resolve(&outcomes).await;

        assert_eq!(result, AccessUrlResult::Unavailable);
    }

    #[tokio::test]
    async fn test_reference_without_adapter_is_skipped() {
        let primary = FakeAdapter::new(ProviderId::Primary).shared();
        let secondary = FakeAdapter::new(ProviderId::Secondary);
        let mut outcomes = ProviderOutcomes::new();
        outcomes.record_success(secondary.reference(KEY));

        let resolver = AccessUrlResolver::new(
            AdapterRegistry::new().with_adapter(primary.clone()),
            vec![ProviderId::Secondary, ProviderId::Primary],
            Duration::from_secs(1),
        );

        assert_eq!(resolver.resolve(&outcomes).await, AccessUrlResult::Unavailable);
        assert_eq!(primary.resolve_calls(), 0);
    }
}
