//! Core role domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, database_id::RoleId, permission::Permission};

/// A validated, non-empty role name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct RoleName(String);

impl RoleName {
    /// Create a role name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyRoleName] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyRoleName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a role name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named group of permissions that can be assigned to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// The role's ID in the database.
    pub id: RoleId,
    /// The unique role name.
    pub name: RoleName,
    /// What the role is for.
    pub description: String,
    /// The permissions granted by the role, sorted by ID.
    pub permissions: Vec<Permission>,
}

/// The name of the role seeded with every permission.
pub const ADMIN_ROLE: &str = "Admin";
/// The name of the role seeded with read access and transaction entry.
pub const USER_ROLE: &str = "User";

/// The permissions granted by the seeded [USER_ROLE].
pub const USER_ROLE_PERMISSIONS: [Permission; 4] = [
    Permission::ViewTransactions,
    Permission::CreateTransaction,
    Permission::ViewPersons,
    Permission::ViewCostTypes,
];

/// Request body for creating or replacing a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleData {
    /// The role name, must not be empty.
    pub name: String,
    /// What the role is for.
    #[serde(default)]
    pub description: String,
    /// The IDs of the permissions to grant.
    #[serde(default)]
    pub permission_ids: Vec<i64>,
}

/// Request body for replacing a role's permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermissionsData {
    /// The role to change.
    pub role_id: RoleId,
    /// The IDs of the permissions to grant.
    pub permission_ids: Vec<i64>,
}
