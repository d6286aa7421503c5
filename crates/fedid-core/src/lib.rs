//! # fedid-core
//!
//! Core types for the fedid virtual identity store.
//!
//! This crate provides the shared vocabulary of the federation layer: claims
//! and their connector-local attribute form, credentials, the linkage model
//! between logical identities and their per-connector partitions, and the
//! error type used across the workspace.
//!
//! ## Modules
//!
//! - [`error`] - Error types and error code mapping
//! - [`id`] - Strongly-typed identifiers for users, groups, and connectors
//! - [`claim`] - Claims, meta claims, attribute mappings
//! - [`credential`] - Credential material and verification inputs
//! - [`partition`] - Logical-to-connector linkage model
//! - [`profile`] - Per-claim configuration profile entries

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod claim;
pub mod credential;
pub mod error;
pub mod id;
pub mod partition;
pub mod profile;

// Re-export commonly used types
pub use error::{Error, Result};
