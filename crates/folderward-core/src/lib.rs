//! Folder-scoped access control over a shared object bucket.
//!
//! Every registered identity owns exactly one top-level folder in the bucket.
//! This crate decides which folder that is, provisions it on first use, binds
//! the folder-scoped policy, and checks file operations against the acting
//! identity's folder before any object is touched.
//!
//! # Architecture
//!
//! ```text
//!            Folderward (service facade)
//!           /        |          \
//!   ScopedFiles  RoleRegistry  PolicyBinder
//!          |                       |
//!   FolderProvisioner -------------+
//!          |
//!          v
//!   IdentityStore / BlobStore / PolicyService  (collaborator traits)
//! ```
//!
//! The collaborator traits live in [`backend`]; in-memory implementations are
//! provided by the `folderward-memory` crate.

pub mod backend;
pub mod binder;
pub mod config;
pub mod error;
pub mod files;
pub mod identity;
pub mod policy;
pub mod provisioner;
pub mod roles;
pub mod service;

pub use backend::{BlobStore, IdentityStore, ObjectMetadata, ObjectSummary, PolicyService};
pub use config::FolderwardConfig;
pub use error::{ErrorKind, FolderwardError, FolderwardResult};
pub use identity::{Email, FolderName, Identity, IdentitySummary, ProvisioningStatus};
pub use service::{Folderward, InitReport};
