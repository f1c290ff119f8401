//! Provider identities, durable references, and per-provider outcomes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies a configured storage backend slot.
///
/// Declaration order is the default retrieval priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Primary object store (S3-compatible).
    Primary,
    /// Secondary object store (Azure Blob Storage).
    Secondary,
}

impl ProviderId {
    /// Every known provider in priority order.
    pub const ALL: [Self; 2] = [Self::Primary, Self::Secondary];

    /// Convert to database string value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of backend a location points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// S3-compatible object store.
    S3,
    /// Azure Blob Storage.
    AzureBlob,
    /// Local filesystem (development only).
    LocalFs,
}

impl BackendKind {
    /// Get the backend name for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::AzureBlob => "azure_blob",
            Self::LocalFs => "local",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "s3" => Some(Self::S3),
            "azure_blob" => Some(Self::AzureBlob),
            "local" => Some(Self::LocalFs),
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable, provider-specific pointer to an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocation {
    /// Backend the object lives in.
    pub backend: BackendKind,
    /// Bucket, container, or local root.
    pub container: String,
    /// Object key inside the container.
    pub key: String,
    /// Storage account, for backends that have one.
    pub account: Option<String>,
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.account {
            Some(account) => write!(
                f,
                "{}://{}/{}/{}",
                self.backend, account, self.container, self.key
            ),
            None => write!(f, "{}://{}/{}", self.backend, self.container, self.key),
        }
    }
}

/// A successful upload of one artifact to one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageReference {
    /// Provider holding the object.
    pub provider: ProviderId,
    /// Where the object is.
    pub location: StorageLocation,
}

/// What is known about one provider for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProviderOutcome {
    /// No upload was ever attempted.
    #[default]
    NotAttempted,
    /// The last attempt failed and no success was ever recorded.
    Failed {
        /// Failure description.
        reason: String,
    },
    /// The object is stored.
    Succeeded(StorageReference),
}

impl ProviderOutcome {
    /// Returns the stored reference, if any.
    #[must_use]
    pub fn reference(&self) -> Option<&StorageReference> {
        match self {
            Self::Succeeded(reference) => Some(reference),
            Self::NotAttempted | Self::Failed { .. } => None,
        }
    }

    /// Whether the provider holds the object.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

static NOT_ATTEMPTED: ProviderOutcome = ProviderOutcome::NotAttempted;

/// Per-provider outcomes of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderOutcomes(BTreeMap<ProviderId, ProviderOutcome>);

impl ProviderOutcomes {
    /// Creates an empty set where every provider is `NotAttempted`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome for a provider.
    #[must_use]
    pub fn get(&self, provider: ProviderId) -> &ProviderOutcome {
        self.0.get(&provider).unwrap_or(&NOT_ATTEMPTED)
    }

    /// Stored reference for a provider.
    #[must_use]
    pub fn reference(&self, provider: ProviderId) -> Option<&StorageReference> {
        self.get(provider).reference()
    }

    /// Records a success, replacing any earlier outcome for that provider.
    pub fn record_success(&mut self, reference: StorageReference) {
        self.0
            .insert(reference.provider, ProviderOutcome::Succeeded(reference));
    }

    /// Records a failure unless the provider already holds the object.
    ///
    /// Returns `false` when an existing success was kept.
    pub fn record_failure(&mut self, provider: ProviderId, reason: impl Into<String>) -> bool {
        let entry = self.0.entry(provider).or_default();
        if entry.is_succeeded() {
            return false;
        }
        *entry = ProviderOutcome::Failed {
            reason: reason.into(),
        };
        true
    }

    /// All stored references in provider order.
    pub fn references(&self) -> impl Iterator<Item = &StorageReference> {
        self.0.values().filter_map(ProviderOutcome::reference)
    }

    /// Whether at least one provider holds the object.
    #[must_use]
    pub fn has_any_reference(&self) -> bool {
        self.references().next().is_some()
    }
}

/// URL a client can use to fetch an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessUrl {
    /// The URL.
    pub url: String,
    /// When a presigned URL stops working. `None` for stable URLs.
    pub expires_at: Option<DateTime<Utc>>,
}
