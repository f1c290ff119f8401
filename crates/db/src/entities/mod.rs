//! `SeaORM` entity definitions.

pub mod artifact_storage_references;
