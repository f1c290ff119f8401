//! Hand-written adapter double for coordinator tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use super::adapter::{StorageAdapter, UploadSource, UploadTarget, unreadable};
use super::error::{ResolutionError, TransferError};
use super::reference::{AccessUrl, BackendKind, ProviderId, StorageLocation, StorageReference};

#[derive(Debug, Clone)]
pub(crate) enum UploadBehavior {
    Succeed,
    Fail(TransferError),
    Hang,
    Panic,
}

#[derive(Debug, Clone)]
pub(crate) enum ResolveBehavior {
    Succeed,
    Fail(ResolutionError),
    Hang,
}

pub(crate) struct FakeAdapter {
    provider: ProviderId,
    upload: UploadBehavior,
    resolve: ResolveBehavior,
    upload_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
    uploaded: Mutex<Vec<(String, Bytes)>>,
}

impl FakeAdapter {
    pub(crate) fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            upload: UploadBehavior::Succeed,
            resolve: ResolveBehavior::Succeed,
            upload_calls: AtomicUsize::new(0),
            resolve_calls: AtomicUsize::new(0),
            uploaded: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(provider: ProviderId) -> Self {
        Self::new(provider).with_upload(UploadBehavior::Fail(TransferError::backend(
            "connection reset",
        )))
    }

    pub(crate) fn with_upload(mut self, behavior: UploadBehavior) -> Self {
        self.upload = behavior;
        self
    }

    pub(crate) fn with_resolve(mut self, behavior: ResolveBehavior) -> Self {
        self.resolve = behavior;
        self
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn uploaded(&self) -> Vec<(String, Bytes)> {
        self.uploaded.lock().unwrap().clone()
    }

    pub(crate) fn location(&self, key: &str) -> StorageLocation {
        let backend = match self.provider {
            ProviderId::Primary => BackendKind::S3,
            ProviderId::Secondary => BackendKind::AzureBlob,
        };
        StorageLocation {
            backend,
            container: format!("fake-{}", self.provider),
            key: key.to_string(),
            account: None,
        }
    }

    pub(crate) fn reference(&self, key: &str) -> StorageReference {
        StorageReference {
            provider: self.provider,
            location: self.location(key),
        }
    }

    pub(crate) fn url_for(provider: ProviderId, key: &str) -> String {
        format!("https://{provider}.storage.test/{key}")
    }
}

#[async_trait]
impl StorageAdapter for FakeAdapter {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    async fn upload(
        &self,
        source: &UploadSource,
        target: &UploadTarget,
    ) -> Result<StorageReference, TransferError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        match &self.upload {
            UploadBehavior::Succeed => {
                let content = match source {
                    UploadSource::Bytes(bytes) => bytes.clone(),
                    UploadSource::File(path) => tokio::fs::read(path)
                        .await
                        .map(Bytes::from)
                        .map_err(|e| unreadable(path, &e))?,
                };
                self.uploaded
                    .lock()
                    .unwrap()
                    .push((target.key.clone(), content));
                Ok(self.reference(&target.key))
            }
            UploadBehavior::Fail(err) => Err(err.clone()),
            UploadBehavior::Hang => std::future::pending().await,
            UploadBehavior::Panic => panic!("adapter exploded"),
        }
    }

    async fn resolve_access_url(
        &self,
        location: &StorageLocation,
    ) -> Result<AccessUrl, ResolutionError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        match &self.resolve {
            ResolveBehavior::Succeed => Ok(AccessUrl {
                url: Self::url_for(self.provider, &location.key),
                expires_at: None,
            }),
            ResolveBehavior::Fail(err) => Err(err.clone()),
            ResolveBehavior::Hang => std::future::pending().await,
        }
    }
}
