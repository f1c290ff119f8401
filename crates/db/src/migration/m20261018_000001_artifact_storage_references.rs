//! Artifact storage references migration.
//!
//! One row per (artifact, provider) pair holding either the stored object's
//! location or the last upload failure.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(ARTIFACT_STORAGE_REFERENCES_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS artifact_storage_references CASCADE;")
            .await?;
        Ok(())
    }
}

const ARTIFACT_STORAGE_REFERENCES_SQL: &str = r"
CREATE TABLE artifact_storage_references (
    artifact_id UUID NOT NULL,
    provider VARCHAR(16) NOT NULL,
    status VARCHAR(16) NOT NULL,
    backend VARCHAR(16),
    container TEXT,
    object_key TEXT,
    account TEXT,
    failure_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (artifact_id, provider),
    CONSTRAINT chk_provider CHECK (provider IN ('primary', 'secondary')),
    CONSTRAINT chk_status CHECK (status IN ('succeeded', 'failed')),
    CONSTRAINT chk_succeeded_location CHECK (
        status <> 'succeeded'
        OR (backend IS NOT NULL AND container IS NOT NULL AND object_key IS NOT NULL)
    )
);

-- Retries look for providers still missing an object
CREATE INDEX idx_artifact_storage_references_failed
    ON artifact_storage_references(updated_at)
    WHERE status = 'failed';
";
