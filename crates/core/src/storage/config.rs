//! Storage provider configuration types.

use std::path::PathBuf;
use std::time::Duration;

use stowage_shared::{AzureSettings, S3Settings};

use super::error::ConfigurationError;
use super::reference::{BackendKind, ProviderId};

/// How the Azure adapter authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum AzureCredential {
    /// Workload/managed identity. Only the account name is configured.
    WorkloadIdentity {
        /// Azure storage account name.
        account: String,
    },
    /// Connection string (development/testing).
    ConnectionString(String),
    /// Shared account key (least secure).
    AccountKey {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        key: String,
    },
}

impl AzureCredential {
    /// Picks a credential strategy from the configured values.
    ///
    /// Priority: account name alone selects workload identity, then a
    /// connection string, then account name with key.
    pub fn select(
        account: Option<&str>,
        connection_string: Option<&str>,
        key: Option<&str>,
    ) -> Result<Self, String> {
        let account = account.filter(|s| !s.is_empty());
        let connection_string = connection_string.filter(|s| !s.is_empty());
        let key = key.filter(|s| !s.is_empty());

        match (account, connection_string, key) {
            (Some(account), None, None) => Ok(Self::WorkloadIdentity {
                account: account.to_string(),
            }),
            (_, Some(conn), _) => Ok(Self::ConnectionString(conn.to_string())),
            (Some(account), None, Some(key)) => Ok(Self::AccountKey {
                account: account.to_string(),
                key: key.to_string(),
            }),
            (None, None, _) => Err(
                "no authentication method configured (account name, connection string, or account name with key)"
                    .to_string(),
            ),
        }
    }

    /// Storage account this credential targets, if it can be determined.
    #[must_use]
    pub fn account(&self) -> Option<&str> {
        match self {
            Self::WorkloadIdentity { account } | Self::AccountKey { account, .. } => {
                Some(account.as_str())
            }
            Self::ConnectionString(conn) => conn
                .split(';')
                .find_map(|part| part.trim().strip_prefix("AccountName=")),
        }
    }

    /// Strategy name for diagnostics.
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::WorkloadIdentity { .. } => "workload_identity",
            Self::ConnectionString(_) => "connection_string",
            Self::AccountKey { .. } => "account_key",
        }
    }
}

impl std::fmt::Debug for AzureCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureCredential")
            .field("strategy", &self.strategy())
            .field("account", &self.account())
            .finish()
    }
}

/// Backend configuration for one provider adapter.
#[derive(Clone)]
pub enum ProviderConfig {
    /// S3-compatible storage: AWS S3, Cloudflare R2, MinIO.
    S3 {
        /// S3 bucket name.
        bucket: String,
        /// Custom endpoint URL.
        endpoint: Option<String>,
        /// AWS region.
        region: String,
        /// Static access key pair. The ambient AWS credential chain is used when unset.
        static_credentials: Option<(String, String)>,
    },
    /// Azure Blob Storage.
    AzureBlob {
        /// Azure container name.
        container: String,
        /// Authentication strategy.
        credential: AzureCredential,
    },
    /// Local filesystem (development only).
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl ProviderConfig {
    /// Region used when none is configured.
    pub const DEFAULT_S3_REGION: &'static str = "us-east-1";

    /// Create S3-compatible provider.
    #[must_use]
    pub fn s3(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self::S3 {
            bucket: bucket.into(),
            endpoint: None,
            region: region.into(),
            static_credentials: None,
        }
    }

    /// Create Azure Blob Storage provider.
    #[must_use]
    pub fn azure_blob(container: impl Into<String>, credential: AzureCredential) -> Self {
        Self::AzureBlob {
            container: container.into(),
            credential,
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Builds an S3 provider from raw settings.
    pub fn from_s3_settings(
        provider: ProviderId,
        settings: &S3Settings,
    ) -> Result<Self, ConfigurationError> {
        let bucket = settings
            .bucket
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                ConfigurationError::invalid_provider(
                    provider,
                    BackendKind::S3,
                    "bucket name not configured",
                )
            })?;

        let static_credentials = match (&settings.access_key_id, &settings.secret_access_key) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            (None, None) => None,
            _ => {
                return Err(ConfigurationError::invalid_provider(
                    provider,
                    BackendKind::S3,
                    "access key id and secret access key must be set together",
                ));
            }
        };

        Ok(Self::S3 {
            bucket: bucket.to_string(),
            endpoint: settings.endpoint.clone().filter(|e| !e.is_empty()),
            region: settings
                .region
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_S3_REGION.to_string()),
            static_credentials,
        })
    }

    /// Builds an Azure provider from raw settings.
    pub fn from_azure_settings(
        provider: ProviderId,
        settings: &AzureSettings,
    ) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| {
            ConfigurationError::invalid_provider(provider, BackendKind::AzureBlob, reason)
        };

        let container = settings
            .container
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| invalid("container name not configured".to_string()))?;

        let credential = AzureCredential::select(
            settings.account_name.as_deref(),
            settings.connection_string.as_deref(),
            settings.account_key.as_deref(),
        )
        .map_err(invalid)?;

        Ok(Self::azure_blob(container, credential))
    }

    /// Backend kind of this configuration.
    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        match self {
            Self::S3 { .. } => BackendKind::S3,
            Self::AzureBlob { .. } => BackendKind::AzureBlob,
            Self::LocalFs { .. } => BackendKind::LocalFs,
        }
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn container(&self) -> String {
        match self {
            Self::S3 { bucket, .. } => bucket.clone(),
            Self::AzureBlob { container, .. } => container.clone(),
            Self::LocalFs { root } => root.to_string_lossy().into_owned(),
        }
    }

    /// Storage account, for backends that have one.
    #[must_use]
    pub fn account(&self) -> Option<String> {
        match self {
            Self::AzureBlob { credential, .. } => credential.account().map(String::from),
            Self::S3 { .. } | Self::LocalFs { .. } => None,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::S3 {
                bucket,
                endpoint,
                region,
                static_credentials,
            } => f
                .debug_struct("S3")
                .field("bucket", bucket)
                .field("endpoint", endpoint)
                .field("region", region)
                .field("static_credentials", &static_credentials.is_some())
                .finish(),
            Self::AzureBlob {
                container,
                credential,
            } => f
                .debug_struct("AzureBlob")
                .field("container", container)
                .field("credential", credential)
                .finish(),
            Self::LocalFs { root } => f.debug_struct("LocalFs").field("root", root).finish(),
        }
    }
}

/// Timeouts and URL lifetimes shared by the adapters and the coordinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageTimings {
    /// Per-provider upload timeout.
    pub upload_timeout: Duration,
    /// Per-provider resolution timeout.
    pub resolve_timeout: Duration,
    /// Presigned download URL TTL.
    pub presign_ttl: Duration,
}

impl StorageTimings {
    /// Default upload timeout: 5 minutes.
    pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);
    /// Default resolution timeout: 30 seconds.
    pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);
    /// Default presigned URL TTL: 1 hour.
    pub const DEFAULT_PRESIGN_TTL: Duration = Duration::from_secs(3600);

    /// Reads timings from raw settings.
    #[must_use]
    pub fn from_settings(settings: &stowage_shared::StorageSettings) -> Self {
        Self {
            upload_timeout: Duration::from_secs(settings.upload_timeout_secs),
            resolve_timeout: Duration::from_secs(settings.resolve_timeout_secs),
            presign_ttl: Duration::from_secs(settings.presign_ttl_secs),
        }
    }
}

impl Default for StorageTimings {
    fn default() -> Self {
        Self {
            upload_timeout: Self::DEFAULT_UPLOAD_TIMEOUT,
            resolve_timeout: Self::DEFAULT_RESOLVE_TIMEOUT,
            presign_ttl: Self::DEFAULT_PRESIGN_TTL,
        }
    }
}
