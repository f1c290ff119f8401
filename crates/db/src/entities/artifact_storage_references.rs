//! `SeaORM` Entity for artifact_storage_references table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status column value for a stored object.
pub const STATUS_SUCCEEDED: &str = "succeeded";
/// Status column value for a failed upload.
pub const STATUS_FAILED: &str = "failed";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "artifact_storage_references")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub artifact_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub provider: String,
    pub status: String,
    pub backend: Option<String>,
    pub container: Option<String>,
    pub object_key: Option<String>,
    pub account: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
