//! Storage error types.

use std::time::Duration;

use thiserror::Error;

use super::reference::{BackendKind, ProviderId};

/// Upload-time failure of a single provider.
///
/// Recovered by the orchestrator; never surfaces to its caller as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Artifact content could not be read.
    #[error("could not read artifact content: {0}")]
    Source(String),

    /// Credentials were rejected.
    #[error("permission denied by provider: {0}")]
    Denied(String),

    /// Provider throttled or ran out of quota.
    #[error("provider throttled the upload: {0}")]
    Throttled(String),

    /// Provider did not finish within the per-call timeout.
    #[error("upload timed out after {0:?}")]
    Timeout(Duration),

    /// The upload task ended without reporting back.
    #[error("upload aborted: {0}")]
    Aborted(String),

    /// Network or backend fault.
    #[error("upload failed: {0}")]
    Backend(String),
}

impl TransferError {
    /// Create an error for unreadable artifact content.
    #[must_use]
    pub fn unreadable(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a backend error.
    #[must_use]
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<opendal::Error> for TransferError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::PermissionDenied => Self::Denied(err.to_string()),
            opendal::ErrorKind::RateLimited => Self::Throttled(err.to_string()),
            _ => Self::Backend(err.to_string()),
        }
    }
}

/// Retrieval-time failure of a single provider.
///
/// Recovered by the resolver, which moves on to the next provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Object missing from the provider.
    #[error("object not found: {key}")]
    NotFound {
        /// Key that was looked up.
        key: String,
    },

    /// Credentials invalid or expired.
    #[error("permission denied by provider: {0}")]
    Denied(String),

    /// The reference does not belong to this adapter's backend or container.
    #[error("reference points to {found}, adapter serves {expected}")]
    LocationMismatch {
        /// What the adapter serves.
        expected: String,
        /// What the reference points to.
        found: String,
    },

    /// Presign operation not supported by provider.
    #[error("presign operation not supported by storage provider")]
    PresignNotSupported,

    /// Provider did not answer within the per-call timeout.
    #[error("resolution timed out after {0:?}")]
    Timeout(Duration),

    /// Network or backend fault.
    #[error("resolution failed: {0}")]
    Backend(String),
}

impl ResolutionError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }
}

impl From<opendal::Error> for ResolutionError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            opendal::ErrorKind::PermissionDenied => Self::Denied(err.to_string()),
            opendal::ErrorKind::Unsupported => Self::PresignNotSupported,
            _ => Self::Backend(err.to_string()),
        }
    }
}

/// Configuration problem. Always degraded to a safe default with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// No upload mode was configured.
    #[error("storage upload mode not configured, defaulting to 'primary'")]
    MissingMode,

    /// Upload mode value is not recognized.
    #[error("unrecognized storage upload mode '{0}', defaulting to 'primary'")]
    UnknownMode(String),

    /// Mode selects a provider that has no usable configuration.
    #[error("{0} storage provider selected but not configured")]
    ProviderNotConfigured(ProviderId),

    /// Provider configuration is present but unusable.
    #[error("{provider} storage provider ({backend}) is misconfigured: {reason}")]
    InvalidProvider {
        /// Provider slot.
        provider: ProviderId,
        /// Backend being configured.
        backend: BackendKind,
        /// What is wrong.
        reason: String,
    },
}

impl ConfigurationError {
    /// Create an invalid provider error.
    #[must_use]
    pub fn invalid_provider(
        provider: ProviderId,
        backend: BackendKind,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidProvider {
            provider,
            backend,
            reason: reason.into(),
        }
    }
}
