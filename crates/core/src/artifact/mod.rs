//! Artifact storage: uploads recordings and debug screenshots to the active
//! providers and resolves access URLs from the stored references.
//!
//! This module provides:
//! - Deterministic object keys per artifact
//! - The reference persistence contract
//! - Upload, retry and access URL operations

mod error;
mod memory;
mod service;
mod types;

pub use error::{PersistenceError, StorageError};
pub use memory::MemoryReferenceRepository;
pub use service::{AccessUrlSource, ArtifactStorageService, ReferenceRepository, UploadReport};
pub use types::{ArtifactDescriptor, ArtifactKind, RetrievableArtifact};
