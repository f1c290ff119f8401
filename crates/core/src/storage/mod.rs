//! Multi-provider object storage built on Apache OpenDAL.
//!
//! An artifact is written to every provider the upload mode selects and read
//! back through whichever provider answers first:
//! - S3-compatible: AWS S3, Cloudflare R2, MinIO (primary slot)
//! - Azure Blob Storage (secondary slot)
//! - Local filesystem (development only, primary slot)
//!
//! # Architecture
//!
//! ```text
//!   StorageSettings ──► ModePlan ──► upload set / retrieval order
//!          │
//!          ▼
//!   AdapterRegistry ─── Arc<dyn StorageAdapter> per provider
//!          │
//!    ┌─────┴──────────────────┐
//!    ▼                        ▼
//! UploadOrchestrator      AccessUrlResolver
//! (JoinSet fan-out,       (sequential fallback,
//!  per-call timeout)       per-call timeout)
//! ```

mod adapter;
mod config;
mod error;
mod mode;
mod orchestrator;
mod reference;
mod registry;
mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{OpendalAdapter, StorageAdapter, UploadSource, UploadTarget};
pub use config::{AzureCredential, ProviderConfig, StorageTimings};
pub use error::{ConfigurationError, ResolutionError, TransferError};
pub use mode::{ModePlan, UploadMode};
pub use orchestrator::{ArtifactUploadOutcome, UploadOrchestrator, UploadStatus};
pub use reference::{
    AccessUrl, BackendKind, ProviderId, ProviderOutcome, ProviderOutcomes, StorageLocation,
    StorageReference,
};
pub use registry::AdapterRegistry;
pub use resolver::{AccessUrlResolver, AccessUrlResult};
