//! Folderward error types.
//!
//! [`FolderwardError`] is the single error type returned by the core and by
//! every collaborator implementation. Callers branch on
//! [`FolderwardError::kind`] rather than on messages, so permission and
//! not-found outcomes stay distinguishable from generic upstream failures.
//!
//! # Usage
//!
//! ```
//! use folderward_core::error::{ErrorKind, FolderwardError};
//!
//! let err = FolderwardError::ObjectNotFound {
//!     path: "a_at_x_com_folder/cat.png".to_owned(),
//! };
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! ```

use std::fmt;

/// Coarse classification of a [`FolderwardError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A role, identity or object is absent.
    NotFound,
    /// An identity or folder assignment already exists.
    AlreadyExists,
    /// A folder-boundary violation.
    PermissionDenied,
    /// An operation was attempted before its prerequisites hold.
    PreconditionFailed,
    /// Caller-supplied input was rejected.
    InvalidArgument,
    /// A concurrent writer changed shared state first.
    Conflict,
    /// Any other collaborator failure.
    Upstream,
}

impl ErrorKind {
    /// Stable machine-readable code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::PermissionDenied => "PermissionDenied",
            Self::PreconditionFailed => "PreconditionFailed",
            Self::InvalidArgument => "InvalidArgument",
            Self::Conflict => "Conflict",
            Self::Upstream => "UpstreamFailure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step of folder provisioning an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionStep {
    /// Looking up the identity record.
    LookupIdentity,
    /// Checking whether the folder marker exists.
    CheckMarker,
    /// Writing the folder marker.
    WriteMarker,
    /// Recording the folder on the identity.
    RecordFolder,
    /// Binding the folder policy.
    BindPolicy,
    /// Recording that the policy was applied.
    RecordPolicy,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LookupIdentity => "lookup identity",
            Self::CheckMarker => "check folder marker",
            Self::WriteMarker => "write folder marker",
            Self::RecordFolder => "record folder",
            Self::BindPolicy => "bind folder policy",
            Self::RecordPolicy => "record policy applied",
        })
    }
}

/// Folderward error type.
#[derive(Debug, thiserror::Error)]
pub enum FolderwardError {
    /// The role does not exist in the role catalog.
    #[error("role not found: {role}")]
    RoleNotFound {
        /// Fully qualified role name.
        role: String,
    },

    /// No identity is registered under this email.
    #[error("identity not found: {email}")]
    IdentityNotFound {
        /// The normalized email.
        email: String,
    },

    /// The object does not exist in the bucket.
    #[error("file not found: {path}")]
    ObjectNotFound {
        /// Object path inside the bucket.
        path: String,
    },

    /// An identity with this email is already registered.
    #[error("identity already exists: {email}")]
    IdentityAlreadyExists {
        /// The normalized email.
        email: String,
    },

    /// The folder is already assigned to a different identity.
    #[error("folder {folder} is already assigned to {owner}")]
    FolderTaken {
        /// The contested folder.
        folder: String,
        /// Identity currently holding it.
        owner: String,
    },

    /// The acting identity may not touch the target path.
    #[error("permission denied: {email} cannot delete {path} outside folder {folder}")]
    PermissionDenied {
        /// Acting identity.
        email: String,
        /// Target object path.
        path: String,
        /// Folder owned by the acting identity.
        folder: String,
    },

    /// Provisioning attempted for an identity that was never registered.
    #[error("identity unknown: {email} must be registered before provisioning")]
    PreconditionFailed {
        /// The normalized email.
        email: String,
    },

    /// The policy document changed since it was read.
    #[error("policy document changed concurrently (stale etag {etag})")]
    PolicyConflict {
        /// Etag the writer held.
        etag: String,
    },

    /// Rejected input.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong.
        message: String,
    },

    /// Failure reported by an external collaborator.
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),

    /// An inner error annotated with the identity and step it happened in.
    #[error("{step} failed for {email}: {source}")]
    Step {
        /// Identity being processed.
        email: String,
        /// Step that failed.
        step: ProvisionStep,
        /// The underlying error.
        #[source]
        source: Box<FolderwardError>,
    },
}

impl FolderwardError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoleNotFound { .. } | Self::IdentityNotFound { .. } | Self::ObjectNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::IdentityAlreadyExists { .. } | Self::FolderTaken { .. } => ErrorKind::AlreadyExists,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::PreconditionFailed { .. } => ErrorKind::PreconditionFailed,
            Self::PolicyConflict { .. } => ErrorKind::Conflict,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Upstream(_) => ErrorKind::Upstream,
            Self::Step { source, .. } => source.kind(),
        }
    }

    /// Shorthand for an [`FolderwardError::InvalidArgument`].
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for an [`FolderwardError::Upstream`] built from a message.
    #[must_use]
    pub fn upstream(message: impl fmt::Display) -> Self {
        Self::Upstream(anyhow::anyhow!("{message}"))
    }

    /// Wrap this error with the identity and provisioning step.
    #[must_use]
    pub fn at_step(self, email: &str, step: ProvisionStep) -> Self {
        Self::Step {
            email: email.to_owned(),
            step,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through [`FolderwardError::Step`] layers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convenience result type for Folderward operations.
pub type FolderwardResult<T> = Result<T, FolderwardError>;
