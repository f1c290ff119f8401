//! Artifact error types.

use stowage_shared::types::ArtifactId;
use thiserror::Error;

use crate::storage::ProviderId;

/// Failure of the reference store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// The backing store rejected or failed the operation.
    #[error("reference store error: {0}")]
    Store(String),

    /// A stored row could not be turned back into a reference.
    #[error("corrupt stored reference for {artifact_id} ({provider}): {reason}")]
    Corrupt {
        /// Artifact the row belongs to.
        artifact_id: ArtifactId,
        /// Provider column value.
        provider: String,
        /// What is wrong.
        reason: String,
    },
}

impl PersistenceError {
    /// Create a store error.
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a corrupt row error.
    #[must_use]
    pub fn corrupt(
        artifact_id: ArtifactId,
        provider: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Corrupt {
            artifact_id,
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

/// Artifact storage operation errors.
///
/// Uploads and URL lookups never fail as a whole; this covers the operations
/// that must read stored state before doing anything.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Stored outcomes could not be loaded.
    #[error("could not load stored references: {0}")]
    Persistence(#[from] PersistenceError),

    /// Persisting a successful upload failed; the object is orphaned.
    #[error("{provider} holds {key} but the reference was not saved: {source}")]
    Orphaned {
        /// Provider holding the object.
        provider: ProviderId,
        /// Object key.
        key: String,
        /// Underlying failure.
        source: PersistenceError,
    },
}
