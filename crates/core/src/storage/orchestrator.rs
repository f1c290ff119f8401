//! Concurrent fan-out of one artifact to every active provider.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span, warn};

use super::adapter::{StorageAdapter, UploadSource, UploadTarget};
use super::error::TransferError;
use super::reference::{ProviderId, StorageReference};

/// Aggregate status of one orchestrated upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Every active provider stored the artifact.
    Complete,
    /// Some providers stored the artifact, some failed.
    Partial,
    /// Every active provider failed.
    Failed,
    /// The active provider set was empty.
    NoProvidersConfigured,
}

/// Per-provider results of one orchestrated upload. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactUploadOutcome {
    results: BTreeMap<ProviderId, Result<StorageReference, TransferError>>,
}

impl ArtifactUploadOutcome {
    /// Outcome for an upload with no active provider.
    #[must_use]
    pub fn no_providers_configured() -> Self {
        Self::default()
    }

    /// Every per-provider result, in provider order.
    pub fn results(
        &self,
    ) -> impl Iterator<Item = (ProviderId, &Result<StorageReference, TransferError>)> {
        self.results.iter().map(|(provider, result)| (*provider, result))
    }

    /// Result for one provider; `None` if it was not active.
    #[must_use]
    pub fn get(&self, provider: ProviderId) -> Option<&Result<StorageReference, TransferError>> {
        self.results.get(&provider)
    }

    /// Whether at least one provider produced a reference.
    #[must_use]
    pub fn any_succeeded(&self) -> bool {
        self.results.values().any(Result::is_ok)
    }

    /// Whether the active provider set was empty.
    #[must_use]
    pub fn is_no_providers_configured(&self) -> bool {
        self.results.is_empty()
    }

    /// Aggregate status.
    #[must_use]
    pub fn status(&self) -> UploadStatus {
        let succeeded = self.results.values().filter(|r| r.is_ok()).count();
        match (self.results.len(), succeeded) {
            (0, _) => UploadStatus::NoProvidersConfigured,
            (_, 0) => UploadStatus::Failed,
            (total, ok) if ok == total => UploadStatus::Complete,
            _ => UploadStatus::Partial,
        }
    }

    /// References returned by successful providers.
    pub fn references(&self) -> impl Iterator<Item = &StorageReference> {
        self.results.values().filter_map(|r| r.as_ref().ok())
    }

    /// Failed providers and their errors.
    pub fn failures(&self) -> impl Iterator<Item = (ProviderId, &TransferError)> {
        self.results
            .iter()
            .filter_map(|(provider, r)| r.as_ref().err().map(|e| (*provider, e)))
    }
}

impl FromIterator<(ProviderId, Result<StorageReference, TransferError>)> for ArtifactUploadOutcome {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (ProviderId, Result<StorageReference, TransferError>)>,
    {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

/// Dispatches one artifact to a set of adapters concurrently.
///
/// Each adapter runs in its own task under a per-call timeout. The upload
/// never fails as a whole; every active provider gets exactly one result.
/// Dropping the returned future aborts the provider tasks still running.
#[derive(Debug, Clone, Copy)]
pub struct UploadOrchestrator {
    upload_timeout: Duration,
}

impl UploadOrchestrator {
    /// Creates an orchestrator with the given per-provider timeout.
    #[must_use]
    pub const fn new(upload_timeout: Duration) -> Self {
        Self { upload_timeout }
    }

    /// Uploads the content to every adapter and collects their results.
    pub async fn upload(
        &self,
        source: &UploadSource,
        target: &UploadTarget,
        adapters: &[Arc<dyn StorageAdapter>],
    ) -> ArtifactUploadOutcome {
        if adapters.is_empty() {
            error!(key = %target.key, "No storage providers configured");
            return ArtifactUploadOutcome::no_providers_configured();
        }

        if let Err(e) = source.check().await {
            warn!(key = %target.key, error = %e, "Artifact content unreadable");
            return adapters
                .iter()
                .map(|adapter| (adapter.provider(), Err(e.clone())))
                .collect();
        }

        // A task that panics or is aborted never reports back; its slot keeps this.
        let mut results: BTreeMap<_, _> = adapters
            .iter()
            .map(|adapter| {
                (
                    adapter.provider(),
                    Err(TransferError::Aborted(
                        "upload task ended without a result".to_string(),
                    )),
                )
            })
            .collect();

        let mut tasks = JoinSet::new();
        for adapter in adapters {
            let provider = adapter.provider();
            let span = info_span!("provider_upload", provider = %provider, key = %target.key);
            tasks.spawn({
                let adapter = Arc::clone(adapter);
                let source = source.clone();
                let target = target.clone();
                let timeout = self.upload_timeout;
                async move {
                    let result = tokio::time::timeout(timeout, adapter.upload(&source, &target))
                        .await
                        .unwrap_or(Err(TransferError::Timeout(timeout)));
                    (provider, result)
                }
                .instrument(span)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((provider, result)) => {
                    match &result {
                        Ok(reference) => {
                            info!(provider = %provider, location = %reference.location, "Upload succeeded");
                        }
                        Err(e) => {
                            warn!(provider = %provider, key = %target.key, error = %e, "Upload failed");
                        }
                    }
                    results.insert(provider, result);
                }
                Err(e) => {
                    error!(key = %target.key, error = %e, "Upload task aborted");
                }
            }
        }

        ArtifactUploadOutcome { results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::{FakeAdapter, UploadBehavior};
    use bytes::Bytes;

    fn target() -> UploadTarget {
        UploadTarget {
            key: "recordings/0190.mp4".to_string(),
            content_type: "video/mp4".to_string(),
        }
    }

    fn source() -> UploadSource {
        UploadSource::Bytes(Bytes::from_static(b"frames"))
    }

    fn orchestrator() -> UploadOrchestrator {
        UploadOrchestrator::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_all_providers_succeed() {
        let primary = FakeAdapter::new(ProviderId::Primary).shared();
        let secondary = FakeAdapter::new(ProviderId::Secondary).shared();
        let adapters: Vec<Arc<dyn StorageAdapter>> = vec![primary.clone(), secondary.clone()];

        let outcome = orchestrator().upload(&source(), &target(), &adapters).await;

        assert_eq!(outcome.status(), UploadStatus::Complete);
        assert!(outcome.any_succeeded());
        assert_eq!(outcome.references().count(), 2);
        assert_eq!(primary.uploaded()[0].0, "recordings/0190.mp4");
        assert_eq!(secondary.uploaded()[0].1, Bytes::from_static(b"frames"));
    }

    #[tokio::test]
    async fn test_one_failure_is_isolated() {
        let adapters: Vec<Arc<dyn StorageAdapter>> = vec![
            FakeAdapter::new(ProviderId::Primary).shared(),
            FakeAdapter::failing(ProviderId::Secondary).shared(),
        ];

        let outcome = orchestrator().upload(&source(), &target(), &adapters).await;

        assert_eq!(outcome.status(), UploadStatus::Partial);
        assert!(matches!(outcome.get(ProviderId::Primary), Some(Ok(_))));
        assert!(matches!(
            outcome.get(ProviderId::Secondary),
            Some(Err(TransferError::Backend(_)))
        ));
        let failed: Vec<_> = outcome.failures().map(|(p, _)| p).collect();
        assert_eq!(failed, vec![ProviderId::Secondary]);
    }

    #[tokio::test]
    async fn test_all_providers_fail() {
        let adapters: Vec<Arc<dyn StorageAdapter>> = vec![
            FakeAdapter::failing(ProviderId::Primary).shared(),
            FakeAdapter::failing(ProviderId::Secondary).shared(),
        ];

        let outcome = orchestrator().upload(&source(), &target(), &adapters).await;

        assert_eq!(outcome.status(), UploadStatus::Failed);
        assert!(!outcome.any_succeeded());
    }

    #[tokio::test]
    async fn test_empty_active_set_is_flagged() {
        let outcome = orchestrator().upload(&source(), &target(), &[]).await;

        assert!(outcome.is_no_providers_configured());
        assert_eq!(outcome.status(), UploadStatus::NoProvidersConfigured);
        assert!(!outcome.any_succeeded());
    }

    #[tokio::test]
    async fn test_hung_provider_times_out() {
        let adapters: Vec<Arc<dyn StorageAdapter>> = vec![
            FakeAdapter::new(ProviderId::Primary).shared(),
            FakeAdapter::new(ProviderId::Secondary)
                .with_upload(UploadBehavior::Hang)
                .shared(),
        ];

        let outcome = UploadOrchestrator::new(Duration::from_millis(50))
            .upload(&source(), &target(), &adapters)
            .await;

        assert!(matches!(outcome.get(ProviderId::Primary), Some(Ok(_))));
        assert!(matches!(
            outcome.get(ProviderId::Secondary),
            Some(Err(TransferError::Timeout(_)))
        ));
        assert_eq!(outcome.status(), UploadStatus::Partial);
    }

    #[tokio::test]
    async fn test_dropped_upload_aborts_running_tasks() {
        let done = FakeAdapter::new(ProviderId::Primary).shared();
        let hung = FakeAdapter::new(ProviderId::Secondary)
            .with_upload(UploadBehavior::Hang)
            .shared();
        let adapters: Vec<Arc<dyn StorageAdapter>> = vec![done.clone(), hung.clone()];

        let cut_short = tokio::time::timeout(
            Duration::from_millis(50),
            orchestrator().upload(&source(), &target(), &adapters),
        )
        .await;
        assert!(cut_short.is_err());
        drop(adapters);

        // The aborted task releases its adapter once the runtime drops it.
        for _ in 0..100 {
            if Arc::strong_count(&hung) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(Arc::strong_count(&hung), 1);
        assert_eq!(hung.upload_calls(), 1);

        // The provider that finished keeps what it stored.
        assert_eq!(Arc::strong_count(&done), 1);
        assert_eq!(done.uploaded()[0].0, "recordings/0190.mp4");
    }

    #[tokio::test]
    async fn test_panicking_provider_is_reported_as_aborted() {
        let adapters: Vec<Arc<dyn StorageAdapter>> = vec![
            FakeAdapter::new(ProviderId::Primary)
                .with_upload(UploadBehavior::Panic)
                .shared(),
            FakeAdapter::new(ProviderId::Secondary).shared(),
        ];

        let outcome = orchestrator().upload(&source(), &target(), &adapters).await;

        assert!(matches!(
            outcome.get(ProviderId::Primary),
            Some(Err(TransferError::Aborted(_)))
        ));
        assert!(matches!(outcome.get(ProviderId::Secondary), Some(Ok(_))));
    }

    #[tokio::test]
    async fn test_unreadable_file_fails_every_provider() {
        let dir = tempfile::tempdir().unwrap();
        let primary = FakeAdapter::new(ProviderId::Primary).shared();
        let secondary = FakeAdapter::new(ProviderId::Secondary).shared();
        let adapters: Vec<Arc<dyn StorageAdapter>> = vec![primary.clone(), secondary.clone()];

        let outcome = orchestrator()
            .upload(
                &UploadSource::File(dir.path().join("missing.mp4")),
                &target(),
                &adapters,
            )
            .await;

        assert_eq!(outcome.status(), UploadStatus::Failed);
        assert!(
            outcome
                .failures()
                .all(|(_, e)| matches!(e, TransferError::Source(_)))
        );
        assert_eq!(primary.upload_calls(), 0);
        assert_eq!(secondary.upload_calls(), 0);
    }

    #[tokio::test]
    async fn test_file_source_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.mp4");
        std::fs::write(&path, b"from disk").unwrap();
        let primary = FakeAdapter::new(ProviderId::Primary).shared();
        let adapters: Vec<Arc<dyn StorageAdapter>> = vec![primary.clone()];

        let outcome = orchestrator()
            .upload(&UploadSource::File(path), &target(), &adapters)
            .await;

        assert_eq!(outcome.status(), UploadStatus::Complete);
        assert_eq!(primary.uploaded()[0].1, Bytes::from_static(b"from disk"));
    }
}
