//! Identity records and folder naming.
//!
//! An [`Identity`] is keyed by its case-normalized [`Email`]. Its folder is a
//! [`FolderName`] derived purely from the email, so the same identity maps to
//! the same folder in every process and across restarts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FolderwardError, FolderwardResult};

/// Name of the empty object that marks a folder as existing.
pub const MARKER_NAME: &str = ".keep";

/// Token substituted for `@` when deriving a folder name.
const AT_TOKEN: &str = "_at_";

/// Suffix appended to every derived folder name.
const FOLDER_SUFFIX: &str = "_folder";

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

/// A trimmed, lowercased email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Normalize and validate an email address.
    ///
    /// # Errors
    ///
    /// Returns [`FolderwardError::InvalidArgument`] unless the input has
    /// exactly one `@` with non-empty parts on both sides and no whitespace
    /// or `/`.
    ///
    /// # Examples
    ///
    /// ```
    /// use folderward_core::identity::Email;
    ///
    /// let email = Email::parse("  A@X.com ").unwrap();
    /// assert_eq!(email.as_str(), "a@x.com");
    /// assert!(Email::parse("not-an-email").is_err());
    /// ```
    pub fn parse(raw: &str) -> FolderwardResult<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(FolderwardError::invalid(format!("invalid email: {raw:?}")));
        };
        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || normalized.chars().any(|c| c.is_whitespace() || c == '/')
        {
            return Err(FolderwardError::invalid(format!("invalid email: {raw:?}")));
        }
        Ok(Self(normalized))
    }

    /// The normalized address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Policy member string for this identity.
    #[must_use]
    pub fn member(&self) -> String {
        format!("user:{}", self.0)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// FolderName
// ---------------------------------------------------------------------------

/// The top-level path segment owned by one identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderName(String);

impl FolderName {
    /// Derive the folder for an email: `@` becomes `_at_`, every `.` becomes
    /// `_`, and `_folder` is appended.
    ///
    /// # Examples
    ///
    /// ```
    /// use folderward_core::identity::{Email, FolderName};
    ///
    /// let email = Email::parse("a@x.com").unwrap();
    /// assert_eq!(FolderName::for_email(&email).as_str(), "a_at_x_com_folder");
    /// ```
    #[must_use]
    pub fn for_email(email: &Email) -> Self {
        let sanitized = email.as_str().replacen('@', AT_TOKEN, 1).replace('.', "_");
        Self(format!("{sanitized}{FOLDER_SUFFIX}"))
    }

    /// Wrap an existing folder name (e.g. one assigned at seeding).
    ///
    /// # Errors
    ///
    /// Returns [`FolderwardError::InvalidArgument`] if the name is empty or
    /// contains `/`.
    pub fn new(name: impl Into<String>) -> FolderwardResult<Self> {
        let name = name.into();
        if name.is_empty() || name.contains('/') {
            return Err(FolderwardError::invalid(format!("invalid folder name: {name:?}")));
        }
        Ok(Self(name))
    }

    /// The folder name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Listing prefix covering the folder's objects (`folder/`).
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}/", self.0)
    }

    /// Path of the folder's marker object.
    #[must_use]
    pub fn marker_path(&self) -> String {
        format!("{}/{MARKER_NAME}", self.0)
    }

    /// Path of a file inside the folder.
    #[must_use]
    pub fn object_path(&self, filename: &str) -> String {
        format!("{}/{filename}", self.0)
    }
}

impl fmt::Display for FolderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Provisioning lifecycle of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvisioningStatus {
    /// Registered; no folder yet.
    Registered,
    /// Folder marker written and recorded.
    FolderCreated,
    /// Folder policy bound. Terminal.
    PolicyApplied,
}

/// A registered identity as persisted by the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Normalized email, the identity's key.
    pub email: Email,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Assigned folder; never reassigned once set.
    pub storage_folder: Option<FolderName>,
    /// Whether the folder marker has been written and recorded.
    pub folder_created: bool,
    /// Whether the folder policy has been bound.
    pub policy_applied: bool,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// A freshly registered identity with no folder.
    #[must_use]
    pub fn new(email: Email, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            email,
            first_name: first_name.into(),
            last_name: last_name.into(),
            storage_folder: None,
            folder_created: false,
            policy_applied: false,
            created_at: Utc::now(),
        }
    }

    /// `"{first} {last}"`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> ProvisioningStatus {
        if self.policy_applied {
            ProvisioningStatus::PolicyApplied
        } else if self.folder_created && self.storage_folder.is_some() {
            ProvisioningStatus::FolderCreated
        } else {
            ProvisioningStatus::Registered
        }
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: &IdentityUpdate) {
        if let Some(folder) = &update.storage_folder {
            self.storage_folder = Some(folder.clone());
        }
        if let Some(created) = update.folder_created {
            self.folder_created = created;
        }
        if let Some(applied) = update.policy_applied {
            self.policy_applied = applied;
        }
    }
}

/// Partial update of the provisioning fields of an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityUpdate {
    /// New folder assignment.
    pub storage_folder: Option<FolderName>,
    /// New `folder_created` flag.
    pub folder_created: Option<bool>,
    /// New `policy_applied` flag.
    pub policy_applied: Option<bool>,
}

impl IdentityUpdate {
    /// Record the folder and mark it created.
    #[must_use]
    pub fn folder_created(folder: FolderName) -> Self {
        Self {
            storage_folder: Some(folder),
            folder_created: Some(true),
            policy_applied: None,
        }
    }

    /// Mark the folder policy as applied.
    #[must_use]
    pub fn policy_applied() -> Self {
        Self {
            policy_applied: Some(true),
            ..Self::default()
        }
    }
}

/// Identity view returned to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    /// Normalized email.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// `"{first} {last}"`.
    pub full_name: String,
    /// Assigned folder, if any.
    pub storage_folder: Option<String>,
    /// Lifecycle state.
    pub status: ProvisioningStatus,
    /// Whether the folder policy has been bound.
    pub policy_applied: bool,
}

impl From<&Identity> for IdentitySummary {
    fn from(identity: &Identity) -> Self {
        Self {
            email: identity.email.to_string(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            full_name: identity.full_name(),
            storage_folder: identity.storage_folder.as_ref().map(ToString::to_string),
            status: identity.status(),
            policy_applied: identity.policy_applied,
        }
    }
}
