//! Artifact storage reference repository.
//!
//! Implements the reference persistence contract using SeaORM.

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::debug;

use crate::entities::artifact_storage_references::{
    self as references, STATUS_FAILED, STATUS_SUCCEEDED,
};
use stowage_core::artifact::{
    PersistenceError, ReferenceRepository as ReferenceRepoTrait, RetrievableArtifact,
};
use stowage_core::storage::{
    BackendKind, ProviderId, ProviderOutcomes, StorageLocation, StorageReference,
};
use stowage_shared::types::ArtifactId;

/// Reference repository implementation.
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    db: DatabaseConnection,
}

impl ReferenceRepository {
    /// Create a new reference repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl ReferenceRepoTrait for ReferenceRepository {
    async fn persist_reference(
        &self,
        artifact_id: ArtifactId,
        reference: &StorageReference,
    ) -> Result<(), PersistenceError> {
        let now = Utc::now().into();
        let location = &reference.location;

        let active_model = references::ActiveModel {
            artifact_id: Set(artifact_id.into_inner()),
            provider: Set(reference.provider.as_str().to_string()),
            status: Set(STATUS_SUCCEEDED.to_string()),
            backend: Set(Some(location.backend.as_str().to_string())),
            container: Set(Some(location.container.clone())),
            object_key: Set(Some(location.key.clone())),
            account: Set(location.account.clone()),
            failure_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let on_conflict = OnConflict::columns([
            references::Column::ArtifactId,
            references::Column::Provider,
        ])
        .update_columns([
            references::Column::Status,
            references::Column::Backend,
            references::Column::Container,
            references::Column::ObjectKey,
            references::Column::Account,
            references::Column::FailureReason,
            references::Column::UpdatedAt,
        ])
        .to_owned();

        references::Entity::insert(active_model)
            .on_conflict(on_conflict)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| PersistenceError::store(e.to_string()))?;

        debug!(artifact_id = %artifact_id, provider = %reference.provider, "Storage reference saved");
        Ok(())
    }

    async fn record_failure(
        &self,
        artifact_id: ArtifactId,
        provider: ProviderId,
        reason: &str,
    ) -> Result<(), PersistenceError> {
        let now = Utc::now().into();

        let active_model = references::ActiveModel {
            artifact_id: Set(artifact_id.into_inner()),
            provider: Set(provider.as_str().to_string()),
            status: Set(STATUS_FAILED.to_string()),
            backend: Set(None),
            container: Set(None),
            object_key: Set(None),
            account: Set(None),
            failure_reason: Set(Some(reason.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // A stored object is never downgraded to a failure.
        let on_conflict = OnConflict::columns([
            references::Column::ArtifactId,
            references::Column::Provider,
        ])
        .update_columns([
            references::Column::FailureReason,
            references::Column::UpdatedAt,
        ])
        .action_and_where(
            Expr::col((references::Entity, references::Column::Status)).ne(STATUS_SUCCEEDED),
        )
        .to_owned();

        let rows = references::Entity::insert(active_model)
            .on_conflict(on_conflict)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| PersistenceError::store(e.to_string()))?;

        if rows == 0 {
            debug!(
                artifact_id = %artifact_id,
                provider = %provider,
                "Upload failure not recorded, object already stored"
            );
        }
        Ok(())
    }

    async fn load_references(
        &self,
        artifact_id: ArtifactId,
    ) -> Result<RetrievableArtifact, PersistenceError> {
        let models = references::Entity::find()
            .filter(references::Column::ArtifactId.eq(artifact_id.into_inner()))
            .all(&self.db)
            .await
            .map_err(|e| PersistenceError::store(e.to_string()))?;

        let mut outcomes = ProviderOutcomes::new();
        for model in models {
            apply_row(artifact_id, model, &mut outcomes)?;
        }

        Ok(RetrievableArtifact {
            id: artifact_id,
            outcomes,
        })
    }
}

/// Convert one stored row into the domain outcome.
fn apply_row(
    artifact_id: ArtifactId,
    model: references::Model,
    outcomes: &mut ProviderOutcomes,
) -> Result<(), PersistenceError> {
    let corrupt = |reason: &str| PersistenceError::corrupt(artifact_id, &model.provider, reason);

    let provider = ProviderId::parse(&model.provider).ok_or_else(|| corrupt("unknown provider"))?;

    match model.status.as_str() {
        STATUS_SUCCEEDED => {
            let backend = model
                .backend
                .as_deref()
                .and_then(BackendKind::parse)
                .ok_or_else(|| corrupt("unknown backend"))?;
            let (Some(container), Some(key)) = (model.container.clone(), model.object_key.clone())
            else {
                return Err(corrupt("incomplete location"));
            };

            outcomes.record_success(StorageReference {
                provider,
                location: StorageLocation {
                    backend,
                    container,
                    key,
                    account: model.account.clone(),
                },
            });
        }
        STATUS_FAILED => {
            outcomes.record_failure(
                provider,
                model.failure_reason.clone().unwrap_or_default(),
            );
        }
        _ => return Err(corrupt("unknown status")),
    }

    Ok(())
}
