//! Stowage uploader
//!
//! Uploads a local recording or debug screenshot to the configured providers
//! and records where it landed. Used by bot controllers once a session ends.
//!
//! Usage:
//!   uploader upload <FILE> --kind recording [--artifact-id <ID>] [--keep-local]
//!   uploader retry <FILE> --artifact-id <ID> --kind recording
//!   uploader url <ID>

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stowage_core::artifact::{
    ArtifactDescriptor, ArtifactKind, ArtifactStorageService, UploadReport,
};
use stowage_core::storage::{AccessUrlResult, UploadSource, UploadStatus};
use stowage_db::{ReferenceRepository, connect_with};
use stowage_shared::AppConfig;
use stowage_shared::types::ArtifactId;

#[derive(Parser, Debug)]
#[command(name = "uploader")]
#[command(about = "Upload artifacts to the configured storage providers", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a local file to every active provider
    Upload {
        /// File to upload
        path: PathBuf,

        /// Artifact kind
        #[arg(long, short = 'k', value_enum, default_value_t = KindArg::Recording)]
        kind: KindArg,

        /// Artifact ID (a new one is generated when omitted)
        #[arg(long)]
        artifact_id: Option<ArtifactId>,

        /// Keep the local file after a successful upload
        #[arg(long)]
        keep_local: bool,
    },

    /// Upload a file again, only to providers that do not hold it yet
    Retry {
        /// File to upload
        path: PathBuf,

        /// Artifact ID the file was first stored under
        #[arg(long)]
        artifact_id: ArtifactId,

        /// Artifact kind
        #[arg(long, short = 'k', value_enum, default_value_t = KindArg::Recording)]
        kind: KindArg,
    },

    /// Print an access URL for a stored artifact
    Url {
        /// Artifact ID
        artifact_id: ArtifactId,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Recording,
    DebugScreenshot,
}

impl From<KindArg> for ArtifactKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Recording => Self::Recording,
            KindArg::DebugScreenshot => Self::DebugScreenshot,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the JSON result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stowage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    let service =
        ArtifactStorageService::from_settings(&config.storage, Arc::new(ReferenceRepository::new(db)));

    match cli.command {
        Commands::Upload {
            path,
            kind,
            artifact_id,
            keep_local,
        } => {
            let descriptor =
                ArtifactDescriptor::for_file(artifact_id.unwrap_or_default(), kind.into(), &path);
            info!(
                artifact_id = %descriptor.id,
                path = %path.display(),
                mode = service.mode().as_str(),
                "Uploading artifact"
            );

            let report = service
                .store_local_file(&descriptor, path, !keep_local)
                .await;
            print_json(&report_json(&descriptor, &report))?;
            Ok(exit_code(&report))
        }
        Commands::Retry {
            path,
            artifact_id,
            kind,
        } => {
            let descriptor = ArtifactDescriptor::for_file(artifact_id, kind.into(), &path);
            let report = service
                .retry_missing(&descriptor, &UploadSource::File(path))
                .await?;

            match report {
                Some(report) => {
                    print_json(&report_json(&descriptor, &report))?;
                    Ok(exit_code(&report))
                }
                None => {
                    print_json(&json!({
                        "artifact_id": descriptor.id,
                        "status": "already_stored",
                    }))?;
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
        Commands::Url { artifact_id } => {
            let result = service.get_access_url(artifact_id).await;
            print_json(&json!({ "artifact_id": artifact_id, "result": result }))?;
            Ok(match result {
                AccessUrlResult::Resolved { .. } => ExitCode::SUCCESS,
                AccessUrlResult::Unavailable => ExitCode::FAILURE,
            })
        }
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// JSON summary of an upload.
fn report_json(descriptor: &ArtifactDescriptor, report: &UploadReport) -> Value {
    let providers: serde_json::Map<String, Value> = report
        .outcome
        .results()
        .map(|(provider, result)| {
            let entry = match result {
                Ok(reference) => json!({ "stored": true, "location": reference.location }),
                Err(e) => json!({ "stored": false, "error": e.to_string() }),
            };
            (provider.as_str().to_string(), entry)
        })
        .collect();

    json!({
        "artifact_id": descriptor.id,
        "key": report.key,
        "status": report.status(),
        "providers": providers,
        "persistence_failures": report
            .persistence_failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    })
}

fn exit_code(report: &UploadReport) -> ExitCode {
    if upload_succeeded(report) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// False when nothing was stored, or when a stored object went unrecorded.
fn upload_succeeded(report: &UploadReport) -> bool {
    match report.status() {
        UploadStatus::Failed | UploadStatus::NoProvidersConfigured => false,
        UploadStatus::Complete | UploadStatus::Partial => report.is_fully_persisted(),
    }
}
