//! In-memory reference store, for tests and single-process tools.

use std::collections::HashMap;

use stowage_shared::types::ArtifactId;
use tokio::sync::RwLock;

use super::error::PersistenceError;
use super::service::ReferenceRepository;
use super::types::RetrievableArtifact;
use crate::storage::{ProviderId, ProviderOutcomes, StorageReference};

/// Reference store backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemoryReferenceRepository {
    artifacts: RwLock<HashMap<ArtifactId, ProviderOutcomes>>,
}

impl MemoryReferenceRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReferenceRepository for MemoryReferenceRepository {
    async fn persist_reference(
        &self,
        artifact_id: ArtifactId,
        reference: &StorageReference,
    ) -> Result<(), PersistenceError> {
        self.artifacts
            .write()
            .await
            .entry(artifact_id)
            .or_default()
            .record_success(reference.clone());
        Ok(())
    }

    async fn record_failure(
        &self,
        artifact_id: ArtifactId,
        provider: ProviderId,
        reason: &str,
    ) -> Result<(), PersistenceError> {
        self.artifacts
            .write()
            .await
            .entry(artifact_id)
            .or_default()
            .record_failure(provider, reason);
        Ok(())
    }

    async fn load_references(
        &self,
        artifact_id: ArtifactId,
    ) -> Result<RetrievableArtifact, PersistenceError> {
        let outcomes = self
            .artifacts
            .read()
            .await
            .get(&artifact_id)
            .cloned()
            .unwrap_or_default();
        Ok(RetrievableArtifact {
            id: artifact_id,
            outcomes,
        })
    }
}
