//! Core storage coordination for Stowage.
//!
//! This crate contains the upload/retrieval logic with ZERO web or database
//! dependencies. The persistence layer plugs in through
//! [`artifact::ReferenceRepository`].
//!
//! # Modules
//!
//! - `storage` - Provider adapters, upload mode, fan-out upload and URL fallback
//! - `artifact` - Artifact keys, reference persistence contract and the storage service

pub mod artifact;
pub mod storage;
