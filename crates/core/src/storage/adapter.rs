//! Provider adapters: one uniform upload / URL capability per backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use opendal::{Operator, Writer, services};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use super::config::{AzureCredential, ProviderConfig};
use super::error::{ConfigurationError, ResolutionError, TransferError};
use super::reference::{AccessUrl, ProviderId, StorageLocation, StorageReference};

/// Where and how an artifact is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Deterministic object key derived from the artifact identity.
    pub key: String,
    /// Content type stored with the object.
    pub content_type: String,
}

/// Part size for streamed file uploads. Also the most a file upload holds
/// in memory per provider.
const UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Where artifact content comes from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Content already in memory.
    Bytes(Bytes),
    /// Content in a local file, streamed by each adapter.
    File(PathBuf),
}

impl UploadSource {
    /// Confirms the content can be read before any provider is called.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Source`] if the file is missing or not a
    /// regular file.
    pub async fn check(&self) -> Result<(), TransferError> {
        match self {
            Self::Bytes(_) => Ok(()),
            Self::File(path) => {
                let metadata = tokio::fs::metadata(path)
                    .await
                    .map_err(|e| unreadable(path, &e))?;
                if metadata.is_file() {
                    Ok(())
                } else {
                    Err(TransferError::unreadable(format!(
                        "{}: not a regular file",
                        path.display()
                    )))
                }
            }
        }
    }

    /// Local file backing this source, if any.
    #[must_use]
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Bytes(_) => None,
        }
    }
}

pub(crate) fn unreadable(path: &Path, err: &std::io::Error) -> TransferError {
    TransferError::unreadable(format!("{}: {err}", path.display()))
}

/// Uniform capability wrapper around one object-storage backend.
///
/// Implementations hold immutable configuration only and are shared across
/// concurrent calls without synchronization.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Provider slot this adapter serves.
    fn provider(&self) -> ProviderId;

    /// Stores the content under `target.key`, overwriting an existing object.
    ///
    /// Either a complete reference is returned or an error; no partial
    /// reference is ever produced.
    async fn upload(
        &self,
        source: &UploadSource,
        target: &UploadTarget,
    ) -> Result<StorageReference, TransferError>;

    /// Produces a client-usable URL for a previously returned location.
    async fn resolve_access_url(
        &self,
        location: &StorageLocation,
    ) -> Result<AccessUrl, ResolutionError>;
}

/// How access URLs are produced.
#[derive(Debug, Clone, PartialEq, Eq)]
enum UrlStyle {
    /// Time-limited signed GET.
    Presigned,
    /// Stable URL under a base, for backends that cannot sign.
    Direct { base: String },
}

/// Adapter backed by an Apache OpenDAL operator.
pub struct OpendalAdapter {
    provider: ProviderId,
    operator: Operator,
    config: ProviderConfig,
    url_style: UrlStyle,
    presign_ttl: Duration,
}

impl OpendalAdapter {
    /// Create an adapter from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be initialized.
    pub fn new(
        provider: ProviderId,
        config: ProviderConfig,
        presign_ttl: Duration,
    ) -> Result<Self, ConfigurationError> {
        let operator = Self::create_operator(provider, &config)?;
        let url_style = Self::url_style(&config);
        info!(
            provider = %provider,
            backend = %config.backend(),
            container = %config.container(),
            "Storage adapter initialized"
        );
        Ok(Self {
            provider,
            operator,
            config,
            url_style,
            presign_ttl,
        })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(
        provider: ProviderId,
        config: &ProviderConfig,
    ) -> Result<Operator, ConfigurationError> {
        let invalid = |e: opendal::Error| {
            ConfigurationError::invalid_provider(provider, config.backend(), e.to_string())
        };

        match config {
            ProviderConfig::S3 {
                bucket,
                endpoint,
                region,
                static_credentials,
            } => {
                let mut builder = services::S3::default().bucket(bucket).region(region);
                if let Some(endpoint) = endpoint {
                    builder = builder.endpoint(endpoint);
                }
                if let Some((access_key_id, secret_access_key)) = static_credentials {
                    builder = builder
                        .access_key_id(access_key_id)
                        .secret_access_key(secret_access_key);
                }

                Ok(Operator::new(builder).map_err(invalid)?.finish())
            }
            ProviderConfig::AzureBlob {
                container,
                credential,
            } => {
                let builder = match credential {
                    AzureCredential::WorkloadIdentity { account } => {
                        info!(provider = %provider, "Using managed identity authentication for Azure Storage");
                        services::Azblob::default()
                            .account_name(account)
                            .endpoint(&azure_endpoint(account))
                    }
                    AzureCredential::ConnectionString(conn) => {
                        info!(provider = %provider, "Using connection string authentication for Azure Storage");
                        services::Azblob::from_connection_string(conn).map_err(invalid)?
                    }
                    AzureCredential::AccountKey { account, key } => {
                        warn!(
                            provider = %provider,
                            "Using account key authentication for Azure Storage - not recommended for production"
                        );
                        services::Azblob::default()
                            .account_name(account)
                            .account_key(key)
                            .endpoint(&azure_endpoint(account))
                    }
                };

                Ok(Operator::new(builder.container(container))
                    .map_err(invalid)?
                    .finish())
            }
            ProviderConfig::LocalFs { root } => {
                let root = root.to_str().ok_or_else(|| {
                    ConfigurationError::invalid_provider(provider, config.backend(), "invalid path")
                })?;

                Ok(Operator::new(services::Fs::default().root(root))
                    .map_err(invalid)?
                    .finish())
            }
        }
    }

    fn url_style(config: &ProviderConfig) -> UrlStyle {
        match config {
            ProviderConfig::S3 { .. } => UrlStyle::Presigned,
            ProviderConfig::AzureBlob {
                container,
                credential,
            } => match credential {
                // Identity-based access cannot mint SAS tokens without a key.
                AzureCredential::WorkloadIdentity { account } => UrlStyle::Direct {
                    base: format!("{}/{container}", azure_endpoint(account)),
                },
                AzureCredential::ConnectionString(_) | AzureCredential::AccountKey { .. } => {
                    UrlStyle::Presigned
                }
            },
            ProviderConfig::LocalFs { root } => UrlStyle::Direct {
                base: format!("file://{}", root.display()),
            },
        }
    }

    fn location_for(&self, key: &str) -> StorageLocation {
        StorageLocation {
            backend: self.config.backend(),
            container: self.config.container(),
            key: key.to_string(),
            account: self.config.account(),
        }
    }

    /// Streams a local file in chunks. A failed stream is aborted so no
    /// partial object is committed.
    async fn write_file(&self, path: &Path, target: &UploadTarget) -> Result<usize, TransferError> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| unreadable(path, &e))?;
        let mut writer = self
            .operator
            .writer_with(&target.key)
            .content_type(&target.content_type)
            .chunk(UPLOAD_CHUNK_SIZE)
            .await?;

        let mut buf = BytesMut::with_capacity(UPLOAD_CHUNK_SIZE);
        let mut written = 0;
        loop {
            let read = match file.read_buf(&mut buf).await {
                Ok(read) => read,
                Err(e) => {
                    self.abort_write(&mut writer, &target.key).await;
                    return Err(unreadable(path, &e));
                }
            };

            if read == 0 || buf.len() >= UPLOAD_CHUNK_SIZE {
                if !buf.is_empty() {
                    written += buf.len();
                    if let Err(e) = writer.write(buf.split().freeze()).await {
                        self.abort_write(&mut writer, &target.key).await;
                        return Err(e.into());
                    }
                    buf.reserve(UPLOAD_CHUNK_SIZE);
                }
                if read == 0 {
                    break;
                }
            }
        }

        if let Err(e) = writer.close().await {
            self.abort_write(&mut writer, &target.key).await;
            return Err(e.into());
        }
        Ok(written)
    }

    async fn abort_write(&self, writer: &mut Writer, key: &str) {
        if let Err(e) = writer.abort().await {
            warn!(provider = %self.provider, key = %key, error = %e, "Failed to abort partial upload");
        }
    }

    /// Rejects locations that were not written through this backend/container.
    fn check_location(&self, location: &StorageLocation) -> Result<(), ResolutionError> {
        let expected = self.location_for(&location.key);
        if location.backend != expected.backend || location.container != expected.container {
            return Err(ResolutionError::LocationMismatch {
                expected: format!("{}://{}", expected.backend, expected.container),
                found: format!("{}://{}", location.backend, location.container),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for OpendalAdapter {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    async fn upload(
        &self,
        source: &UploadSource,
        target: &UploadTarget,
    ) -> Result<StorageReference, TransferError> {
        let size = match source {
            UploadSource::Bytes(content) => {
                self.operator
                    .write_with(&target.key, content.clone())
                    .content_type(&target.content_type)
                    .await?;
                content.len()
            }
            UploadSource::File(path) => self.write_file(path, target).await?,
        };

        debug!(
            provider = %self.provider,
            key = %target.key,
            size,
            "Object written"
        );

        Ok(StorageReference {
            provider: self.provider,
            location: self.location_for(&target.key),
        })
    }

    async fn resolve_access_url(
        &self,
        location: &StorageLocation,
    ) -> Result<AccessUrl, ResolutionError> {
        self.check_location(location)?;

        // A URL to a missing object is worse than no URL.
        self.operator
            .stat(&location.key)
            .await
            .map_err(|e| match e.kind() {
                opendal::ErrorKind::NotFound => ResolutionError::not_found(&location.key),
                _ => ResolutionError::from(e),
            })?;

        match &self.url_style {
            UrlStyle::Presigned => {
                let presigned = self
                    .operator
                    .presign_read(&location.key, self.presign_ttl)
                    .await?;

                Ok(AccessUrl {
                    url: presigned.uri().to_string(),
                    expires_at: chrono::Duration::from_std(self.presign_ttl)
                        .ok()
                        .and_then(|ttl| Utc::now().checked_add_signed(ttl)),
                })
            }
            UrlStyle::Direct { base } => Ok(AccessUrl {
                url: format!("{base}/{}", location.key),
                expires_at: None,
            }),
        }
    }
}

fn azure_endpoint(account: &str) -> String {
    format!("https://{account}.blob.core.windows.net")
}
