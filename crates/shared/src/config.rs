//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Storage configuration as read from files and environment.
///
/// Values are kept raw here. Interpreting the upload mode and deciding which
/// providers are usable happens in `stowage-core`, which degrades to safe
/// defaults instead of rejecting the configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Upload mode: `primary`, `secondary` or `both`.
    #[serde(default)]
    pub upload_mode: Option<String>,
    /// Primary provider (S3-compatible).
    #[serde(default)]
    pub s3: Option<S3Settings>,
    /// Secondary provider (Azure Blob Storage).
    #[serde(default)]
    pub azure: Option<AzureSettings>,
    /// Local directory used as the primary backend when no S3 bucket is set.
    #[serde(default)]
    pub local_root: Option<String>,
    /// Per-provider upload timeout in seconds.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
    /// Per-provider URL resolution timeout in seconds.
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,
    /// Presigned download URL TTL in seconds.
    #[serde(default = "default_presign_ttl")]
    pub presign_ttl_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            upload_mode: None,
            s3: None,
            azure: None,
            local_root: None,
            upload_timeout_secs: default_upload_timeout(),
            resolve_timeout_secs: default_resolve_timeout(),
            presign_ttl_secs: default_presign_ttl(),
        }
    }
}

fn default_upload_timeout() -> u64 {
    300 // 5 minutes
}

fn default_resolve_timeout() -> u64 {
    30
}

fn default_presign_ttl() -> u64 {
    3600 // 1 hour
}

/// S3-compatible provider settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Settings {
    /// Bucket receiving the artifacts.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Custom endpoint (R2, MinIO, ...).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Region.
    #[serde(default)]
    pub region: Option<String>,
    /// Access key ID. Ambient AWS credentials are used when unset.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

/// Azure Blob Storage provider settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AzureSettings {
    /// Container receiving the artifacts.
    #[serde(default)]
    pub container: Option<String>,
    /// Storage account name.
    #[serde(default)]
    pub account_name: Option<String>,
    /// Connection string (development/testing).
    #[serde(default)]
    pub connection_string: Option<String>,
    /// Account key (not recommended for production).
    #[serde(default)]
    pub account_key: Option<String>,
}

/// Flat environment variables understood for backwards compatibility.
///
/// They are registered as defaults, so `config/*` files and `STOWAGE__*`
/// variables take precedence. `DATABASE_URL` is shared with the migrator.
const LEGACY_VARS: &[(&str, &str)] = &[
    ("database.url", "DATABASE_URL"),
    ("storage.upload_mode", "STORAGE_UPLOAD_MODE"),
    ("storage.s3.bucket", "AWS_RECORDING_STORAGE_BUCKET_NAME"),
    ("storage.s3.endpoint", "AWS_ENDPOINT_URL"),
    ("storage.s3.region", "AWS_DEFAULT_REGION"),
    ("storage.s3.access_key_id", "AWS_ACCESS_KEY_ID"),
    ("storage.s3.secret_access_key", "AWS_SECRET_ACCESS_KEY"),
    ("storage.azure.account_name", "AZURE_STORAGE_ACCOUNT_NAME"),
    ("storage.azure.container", "AZURE_STORAGE_CONTAINER_NAME"),
    ("storage.azure.connection_string", "AZURE_STORAGE_CONNECTION_STRING"),
    ("storage.azure.account_key", "AZURE_STORAGE_ACCOUNT_KEY"),
];

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder();
        for (key, var) in LEGACY_VARS {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_default(*key, value)?;
            }
        }

        let config = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("STOWAGE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
