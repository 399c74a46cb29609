//! Bucket policy document model.
//!
//! A [`PolicyDocument`] is an ordered list of [`Binding`]s. The binder reads
//! one from the policy service, transforms it with the pure upserts in this
//! module, and writes the whole document back. The upserts are predicate
//! based and independent of each other, so applying the owner grant and the
//! viewer grant in either order yields the same document.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Title prefix of the condition scoping an owner grant to one folder.
pub const FOLDER_OWNER_CONDITION_PREFIX: &str = "FolderOwner_";

/// A named predicate restricting a binding to objects under a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Unique title; identifies an already-applied folder grant.
    pub title: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Predicate over the resource name.
    pub expression: String,
}

impl Condition {
    /// Condition matching every resource whose name starts with `prefix`.
    #[must_use]
    pub fn resource_prefix(
        title: impl Into<String>,
        description: impl Into<String>,
        prefix: &str,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            expression: format!("resource.name.startsWith(\"{prefix}\")"),
        }
    }
}

/// One `(role, members, condition)` entry of a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Fully qualified role name.
    pub role: String,
    /// Member strings such as `user:a@x.com`.
    pub members: BTreeSet<String>,
    /// Optional scope restriction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl Binding {
    /// A binding granting `role` to a single member.
    #[must_use]
    pub fn single(role: impl Into<String>, member: impl Into<String>, condition: Option<Condition>) -> Self {
        Self {
            role: role.into(),
            members: BTreeSet::from([member.into()]),
            condition,
        }
    }

    /// Whether the binding's condition carries `title`.
    #[must_use]
    pub fn has_condition_title(&self, title: &str) -> bool {
        self.condition.as_ref().is_some_and(|c| c.title == title)
    }

    /// Whether this is an unconditional grant of `role` that includes `member`.
    #[must_use]
    pub fn grants_unconditionally(&self, role: &str, member: &str) -> bool {
        self.condition.is_none() && self.role == role && self.members.contains(member)
    }
}

/// The bucket-wide authorization policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Schema version; conditional bindings require version 3.
    pub version: u32,
    /// Opaque version tag used for optimistic concurrency on write.
    #[serde(default)]
    pub etag: String,
    /// Role bindings in insertion order.
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl PolicyDocument {
    /// Whether any binding carries a condition titled `title`.
    #[must_use]
    pub fn has_condition_title(&self, title: &str) -> bool {
        self.bindings.iter().any(|b| b.has_condition_title(title))
    }

    /// Whether an unconditional binding grants `role` to `member`.
    #[must_use]
    pub fn grants_unconditionally(&self, role: &str, member: &str) -> bool {
        self.bindings_for_role(role)
            .any(|b| b.grants_unconditionally(role, member))
    }

    /// Append a conditional grant unless a binding with the same condition
    /// title exists. Returns whether the document changed.
    pub fn upsert_conditional(&mut self, role: &str, member: &str, condition: Condition) -> bool {
        if self.has_condition_title(&condition.title) {
            return false;
        }
        self.bindings
            .push(Binding::single(role, member, Some(condition)));
        true
    }

    /// Append an unconditional grant unless one already covers `member`.
    /// Returns whether the document changed.
    pub fn upsert_unconditional(&mut self, role: &str, member: &str) -> bool {
        if self.grants_unconditionally(role, member) {
            return false;
        }
        self.bindings.push(Binding::single(role, member, None));
        true
    }

    /// Bindings whose role is `role`.
    pub fn bindings_for_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a Binding> + 'a {
        self.bindings.iter().filter(move |b| b.role == role)
    }
}

/// Condition title for the owner grant of `folder`.
#[must_use]
pub fn folder_condition_title(folder: &str) -> String {
    format!("{FOLDER_OWNER_CONDITION_PREFIX}{folder}")
}
