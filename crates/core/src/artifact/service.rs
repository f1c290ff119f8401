//! Artifact storage service implementation.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use stowage_shared::StorageSettings;
use stowage_shared::types::ArtifactId;
use tracing::{debug, error, info, warn};

use super::error::{PersistenceError, StorageError};
use super::types::{ArtifactDescriptor, RetrievableArtifact};
use crate::storage::{
    AccessUrlResolver, AccessUrlResult, AdapterRegistry, ArtifactUploadOutcome, ModePlan,
    ProviderId, StorageAdapter, StorageReference, StorageTimings, UploadMode, UploadOrchestrator,
    UploadSource, UploadStatus,
};

/// Repository trait for per-provider storage references.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait ReferenceRepository: Send + Sync {
    /// Store a successful upload. Overwrites any earlier outcome for the
    /// same (artifact, provider) pair.
    fn persist_reference(
        &self,
        artifact_id: ArtifactId,
        reference: &StorageReference,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;

    /// Store a failed upload unless a success is already recorded.
    fn record_failure(
        &self,
        artifact_id: ArtifactId,
        provider: ProviderId,
        reason: &str,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;

    /// Load every stored outcome of an artifact. Unknown artifacts load empty.
    fn load_references(
        &self,
        artifact_id: ArtifactId,
    ) -> impl std::future::Future<Output = Result<RetrievableArtifact, PersistenceError>> + Send;
}

/// Result of storing one artifact.
#[derive(Debug)]
pub struct UploadReport {
    /// Object key the artifact was written under.
    pub key: String,
    /// Per-provider upload results.
    pub outcome: ArtifactUploadOutcome,
    /// Outcomes that could not be saved.
    pub persistence_failures: Vec<StorageError>,
}

impl UploadReport {
    /// Aggregate upload status.
    #[must_use]
    pub fn status(&self) -> UploadStatus {
        self.outcome.status()
    }

    /// Whether every upload result was saved.
    #[must_use]
    pub fn is_fully_persisted(&self) -> bool {
        self.persistence_failures.is_empty()
    }

    /// Whether some provider stored the artifact and its reference was saved,
    /// so the artifact can be found again.
    #[must_use]
    pub fn has_recorded_copy(&self) -> bool {
        self.outcome.references().any(|reference| {
            !self.persistence_failures.iter().any(|failure| {
                matches!(failure, StorageError::Orphaned { provider, .. } if *provider == reference.provider)
            })
        })
    }
}

/// Lookup surface used by the HTTP layer.
#[async_trait]
pub trait AccessUrlSource: Send + Sync {
    /// Resolve an access URL for an artifact.
    async fn access_url(&self, artifact_id: ArtifactId) -> AccessUrlResult;

    /// Providers receiving uploads.
    fn configured_providers(&self) -> Vec<ProviderId>;
}

/// Uploads artifacts to the active providers and resolves access URLs.
pub struct ArtifactStorageService<R: ReferenceRepository> {
    mode: UploadMode,
    active: Vec<Arc<dyn StorageAdapter>>,
    orchestrator: UploadOrchestrator,
    resolver: AccessUrlResolver,
    repo: Arc<R>,
}

impl<R: ReferenceRepository> ArtifactStorageService<R> {
    /// Create a new artifact storage service.
    ///
    /// Providers the plan selects for upload but the registry lacks are
    /// dropped with a warning.
    #[must_use]
    pub fn new(
        plan: &ModePlan,
        registry: AdapterRegistry,
        timings: StorageTimings,
        repo: Arc<R>,
    ) -> Self {
        if let Some(diagnostic) = &plan.diagnostic {
            warn!(error = %diagnostic, "Storage upload mode");
        }

        let (active, _missing) = registry.select(&plan.upload);
        if active.is_empty() {
            warn!(mode = plan.mode.as_str(), "No storage providers active; uploads will be skipped");
        } else {
            info!(
                mode = plan.mode.as_str(),
                providers = ?active.iter().map(|a| a.provider()).collect::<Vec<_>>(),
                "Artifact storage ready"
            );
        }

        Self {
            mode: plan.mode,
            active,
            orchestrator: UploadOrchestrator::new(timings.upload_timeout),
            resolver: AccessUrlResolver::new(
                registry,
                plan.retrieval.clone(),
                timings.resolve_timeout,
            ),
            repo,
        }
    }

    /// Builds adapters and the mode plan from configuration.
    ///
    /// Never fails: unusable configuration degrades to fewer providers.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings, repo: Arc<R>) -> Self {
        let plan = ModePlan::from_setting(settings.upload_mode.as_deref());
        let timings = StorageTimings::from_settings(settings);
        let (registry, _diagnostics) = AdapterRegistry::from_settings(settings, &timings);
        Self::new(&plan, registry, timings, repo)
    }

    /// Effective upload mode.
    #[must_use]
    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    /// Providers receiving uploads.
    #[must_use]
    pub fn configured_providers(&self) -> Vec<ProviderId> {
        self.active.iter().map(|adapter| adapter.provider()).collect()
    }

    /// Whether any provider receives uploads.
    #[must_use]
    pub fn has_storage_configured(&self) -> bool {
        !self.active.is_empty()
    }

    /// Upload an artifact to every active provider and save the outcomes.
    ///
    /// Never fails as a whole; per-provider results and persistence
    /// failures are in the report.
    pub async fn store_artifact(
        &self,
        descriptor: &ArtifactDescriptor,
        source: &UploadSource,
    ) -> UploadReport {
        self.upload_to(descriptor, source, &self.active).await
    }

    /// Upload a local file, optionally removing it afterwards.
    ///
    /// The file is removed only when at least one provider stored it and
    /// that provider's reference was saved.
    pub async fn store_local_file(
        &self,
        descriptor: &ArtifactDescriptor,
        path: PathBuf,
        remove_after_upload: bool,
    ) -> UploadReport {
        let source = UploadSource::File(path);
        let report = self.store_artifact(descriptor, &source).await;

        if let (true, Some(path)) = (remove_after_upload, source.local_path()) {
            if report.has_recorded_copy() {
                match tokio::fs::remove_file(path).await {
                    Ok(()) => debug!(path = %path.display(), "Local file removed"),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to remove local file");
                    }
                }
            } else {
                warn!(
                    path = %path.display(),
                    artifact_id = %descriptor.id,
                    "Keeping local file, no provider holds a recorded copy"
                );
            }
        }

        report
    }

    /// Upload only to active providers without a stored success.
    ///
    /// Returns `None` when every active provider already holds the artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored outcomes cannot be loaded.
    pub async fn retry_missing(
        &self,
        descriptor: &ArtifactDescriptor,
        source: &UploadSource,
    ) -> Result<Option<UploadReport>, StorageError> {
        let stored = self.repo.load_references(descriptor.id).await?;

        let missing: Vec<_> = self
            .active
            .iter()
            .filter(|adapter| !stored.outcomes.get(adapter.provider()).is_succeeded())
            .cloned()
            .collect();

        if missing.is_empty() {
            debug!(artifact_id = %descriptor.id, "Artifact already stored on every active provider");
            return Ok(None);
        }

        Ok(Some(self.upload_to(descriptor, source, &missing).await))
    }

    /// Resolve an access URL from the stored references.
    ///
    /// A load failure is logged and reported as unavailable.
    pub async fn get_access_url(&self, artifact_id: ArtifactId) -> AccessUrlResult {
        let artifact = match self.repo.load_references(artifact_id).await {
            Ok(artifact) => artifact,
            Err(e) => {
                error!(artifact_id = %artifact_id, error = %e, "Failed to load storage references");
                return AccessUrlResult::Unavailable;
            }
        };

        if !artifact.outcomes.has_any_reference() {
            debug!(artifact_id = %artifact_id, "No stored reference for artifact");
            return AccessUrlResult::Unavailable;
        }

        let result = self.resolver.resolve(&artifact.outcomes).await;
        if result == AccessUrlResult::Unavailable {
            info!(artifact_id = %artifact_id, "No storage provider could serve the artifact");
        }
        result
    }

    async fn upload_to(
        &self,
        descriptor: &ArtifactDescriptor,
        source: &UploadSource,
        adapters: &[Arc<dyn StorageAdapter>],
    ) -> UploadReport {
        let target = descriptor.upload_target();
        let outcome = self.orchestrator.upload(source, &target, adapters).await;
        let persistence_failures = self.save_outcome(descriptor.id, &target.key, &outcome).await;

        info!(
            artifact_id = %descriptor.id,
            kind = descriptor.kind.as_str(),
            status = ?outcome.status(),
            "Artifact upload finished"
        );

        UploadReport {
            key: target.key,
            outcome,
            persistence_failures,
        }
    }

    /// Saves every provider result independently; one failing save does not
    /// stop the others.
    async fn save_outcome(
        &self,
        artifact_id: ArtifactId,
        key: &str,
        outcome: &ArtifactUploadOutcome,
    ) -> Vec<StorageError> {
        let mut failures = Vec::new();

        for (provider, result) in outcome.results() {
            match result {
                Ok(reference) => {
                    if let Err(e) = self.repo.persist_reference(artifact_id, reference).await {
                        error!(
                            artifact_id = %artifact_id,
                            provider = %provider,
                            location = %reference.location,
                            error = %e,
                            "Failed to save storage reference; uploaded object is orphaned"
                        );
                        failures.push(StorageError::Orphaned {
                            provider,
                            key: key.to_string(),
                            source: e,
                        });
                    }
                }
                Err(transfer) => {
                    let reason = transfer.to_string();
                    if let Err(e) = self.repo.record_failure(artifact_id, provider, &reason).await {
                        error!(
                            artifact_id = %artifact_id,
                            provider = %provider,
                            error = %e,
                            "Failed to record upload failure"
                        );
                        failures.push(StorageError::Persistence(e));
                    }
                }
            }
        }

        failures
    }
}

#[async_trait]
impl<R: ReferenceRepository + 'static> AccessUrlSource for ArtifactStorageService<R> {
    async fn access_url(&self, artifact_id: ArtifactId) -> AccessUrlResult {
        self.get_access_url(artifact_id).await
    }

    fn configured_providers(&self) -> Vec<ProviderId> {
        ArtifactStorageService::configured_providers(self)
    }
}
