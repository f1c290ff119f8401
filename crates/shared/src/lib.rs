//! Shared configuration, errors, and identifiers for Stowage.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for artifacts
//! - Application-wide error types
//! - Configuration management, including the storage provider settings

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, AzureSettings, S3Settings, StorageSettings};
pub use error::AppError;
