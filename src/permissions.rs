//! Users, permission names and the checker capability every gate goes through.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::models::Attachment;
use crate::storage::Database;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Upload new attachments.
    #[serde(rename = "attachments.add_attachment")]
    AddAttachment,
    /// Delete attachments the user created.
    #[serde(rename = "attachments.delete_attachment")]
    DeleteAttachment,
    /// Delete attachments created by anyone.
    #[serde(rename = "attachments.delete_foreign_attachments")]
    DeleteForeignAttachments,
}

impl Permission {
    pub const ALL: [Permission; 3] = [
        Permission::AddAttachment,
        Permission::DeleteAttachment,
        Permission::DeleteForeignAttachments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::AddAttachment => "attachments.add_attachment",
            Permission::DeleteAttachment => "attachments.delete_attachment",
            Permission::DeleteForeignAttachments => "attachments.delete_foreign_attachments",
        }
    }
}

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: String,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Identity collaborator: answers whether a user holds a permission.
pub trait PermissionChecker: Send + Sync {
    fn has_permission(&self, user: &User, permission: Permission) -> bool;
}

/// Grants stored in the attachment database. Lookup failures deny.
impl PermissionChecker for Database {
    fn has_permission(&self, user: &User, permission: Permission) -> bool {
        match self.get_user_permissions(&user.id) {
            Ok(names) => names.iter().any(|name| name == permission.as_str()),
            Err(e) => {
                tracing::warn!(user = %user.id, error = %e, "Failed to load permission grants");
                false
            }
        }
    }
}

/// Fixed in-memory grants, for embedding hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    grants: HashMap<String, HashSet<Permission>>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, user_id: &str, permissions: &[Permission]) -> Self {
        self.grants
            .entry(user_id.to_string())
            .or_default()
            .extend(permissions.iter().copied());
        self
    }
}

impl PermissionChecker for StaticPermissions {
    fn has_permission(&self, user: &User, permission: Permission) -> bool {
        self.grants
            .get(&user.id)
            .is_some_and(|perms| perms.contains(&permission))
    }
}

/// Foreign-delete holders may delete anything; otherwise only the creator, and
/// only with the own-delete permission.
pub fn can_delete(checker: &dyn PermissionChecker, user: &User, attachment: &Attachment) -> bool {
    checker.has_permission(user, Permission::DeleteForeignAttachments)
        || (user.id == attachment.creator
            && checker.has_permission(user, Permission::DeleteAttachment))
}

pub fn can_add(checker: &dyn PermissionChecker, user: &User) -> bool {
    checker.has_permission(user, Permission::AddAttachment)
}
