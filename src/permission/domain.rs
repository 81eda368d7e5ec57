//! The static set of permissions that can be granted to roles.

use std::fmt::Display;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::Error;

/// An atomic right checked by an API route.
///
/// The discriminants are the permission IDs stored in the database and must
/// not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    /// Can view all transactions.
    ViewTransactions = 1,
    /// Can create new transactions.
    CreateTransaction = 2,
    /// Can edit existing transactions.
    EditTransaction = 3,
    /// Can delete transactions.
    DeleteTransaction = 4,
    /// Can view all persons.
    ViewPersons = 11,
    /// Can create new persons.
    CreatePerson = 12,
    /// Can edit existing persons.
    EditPerson = 13,
    /// Can delete persons.
    DeletePerson = 14,
    /// Can view all cost types.
    ViewCostTypes = 21,
    /// Can create new cost types.
    CreateCostType = 22,
    /// Can edit existing cost types.
    EditCostType = 23,
    /// Can delete cost types.
    DeleteCostType = 24,
    /// Can view all users.
    ViewUsers = 31,
    /// Can create new users.
    CreateUser = 32,
    /// Can edit existing users.
    EditUser = 33,
    /// Can delete users.
    DeleteUser = 34,
    /// Can view all roles.
    ViewRoles = 41,
    /// Can create new roles.
    CreateRole = 42,
    /// Can edit existing roles.
    EditRole = 43,
    /// Can delete roles.
    DeleteRole = 44,
    /// Can manage permissions.
    ManagePermissions = 51,
    /// Can change system settings.
    SystemSettings = 52,
}

impl Permission {
    /// Every permission, in ID order.
    pub const ALL: [Permission; 22] = [
        Permission::ViewTransactions,
        Permission::CreateTransaction,
        Permission::EditTransaction,
        Permission::DeleteTransaction,
        Permission::ViewPersons,
        Permission::CreatePerson,
        Permission::EditPerson,
        Permission::DeletePerson,
        Permission::ViewCostTypes,
        Permission::CreateCostType,
        Permission::EditCostType,
        Permission::DeleteCostType,
        Permission::ViewUsers,
        Permission::CreateUser,
        Permission::EditUser,
        Permission::DeleteUser,
        Permission::ViewRoles,
        Permission::CreateRole,
        Permission::EditRole,
        Permission::DeleteRole,
        Permission::ManagePermissions,
        Permission::SystemSettings,
    ];

    /// The stable numeric ID of the permission.
    pub fn id(self) -> i64 {
        self as i64
    }

    /// Look up a permission by its numeric ID.
    ///
    /// # Errors
    ///
    /// Returns [Error::PermissionNotFound] if no permission has the ID `id`.
    pub fn from_id(id: i64) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|permission| permission.id() == id)
            .ok_or(Error::PermissionNotFound(id))
    }

    /// The name of the permission, e.g. "ViewTransactions".
    pub fn name(self) -> &'static str {
        match self {
            Permission::ViewTransactions => "ViewTransactions",
            Permission::CreateTransaction => "CreateTransaction",
            Permission::EditTransaction => "EditTransaction",
            Permission::DeleteTransaction => "DeleteTransaction",
            Permission::ViewPersons => "ViewPersons",
            Permission::CreatePerson => "CreatePerson",
            Permission::EditPerson => "EditPerson",
            Permission::DeletePerson => "DeletePerson",
            Permission::ViewCostTypes => "ViewCostTypes",
            Permission::CreateCostType => "CreateCostType",
            Permission::EditCostType => "EditCostType",
            Permission::DeleteCostType => "DeleteCostType",
            Permission::ViewUsers => "ViewUsers",
            Permission::CreateUser => "CreateUser",
            Permission::EditUser => "EditUser",
            Permission::DeleteUser => "DeleteUser",
            Permission::ViewRoles => "ViewRoles",
            Permission::CreateRole => "CreateRole",
            Permission::EditRole => "EditRole",
            Permission::DeleteRole => "DeleteRole",
            Permission::ManagePermissions => "ManagePermissions",
            Permission::SystemSettings => "SystemSettings",
        }
    }

    /// A sentence describing what the permission allows.
    pub fn description(self) -> &'static str {
        match self {
            Permission::ViewTransactions => "Can view all transactions",
            Permission::CreateTransaction => "Can create new transactions",
            Permission::EditTransaction => "Can edit existing transactions",
            Permission::DeleteTransaction => "Can delete transactions",
            Permission::ViewPersons => "Can view all persons",
            Permission::CreatePerson => "Can create new persons",
            Permission::EditPerson => "Can edit existing persons",
            Permission::DeletePerson => "Can delete persons",
            Permission::ViewCostTypes => "Can view all cost types",
            Permission::CreateCostType => "Can create new cost types",
            Permission::EditCostType => "Can edit existing cost types",
            Permission::DeleteCostType => "Can delete cost types",
            Permission::ViewUsers => "Can view all users",
            Permission::CreateUser => "Can create new users",
            Permission::EditUser => "Can edit existing users",
            Permission::DeleteUser => "Can delete users",
            Permission::ViewRoles => "Can view all roles",
            Permission::CreateRole => "Can create new roles",
            Permission::EditRole => "Can edit existing roles",
            Permission::DeleteRole => "Can delete roles",
            Permission::ManagePermissions => "Can manage permissions",
            Permission::SystemSettings => "Can change system settings",
        }
    }

    /// Convert a list of raw permission IDs from a request into permissions.
    ///
    /// Duplicate IDs are collapsed and the result is sorted by ID.
    ///
    /// # Errors
    ///
    /// Returns [Error::PermissionNotFound] for the first unknown ID.
    pub fn parse_ids(ids: &[i64]) -> Result<Vec<Self>, Error> {
        let mut permissions = ids
            .iter()
            .map(|&id| Self::from_id(id))
            .collect::<Result<Vec<_>, _>>()?;
        permissions.sort();
        permissions.dedup();

        Ok(permissions)
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl ToSql for Permission {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.id()))
    }
}

impl FromSql for Permission {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let id = value.as_i64()?;

        Permission::from_id(id).map_err(|_| FromSqlError::OutOfRange(id))
    }
}

/// The JSON view of a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionInfo {
    /// The stable numeric ID.
    pub id: i64,
    /// The permission name, e.g. "ViewTransactions".
    pub name: String,
    /// What the permission allows.
    pub description: String,
}

impl From<Permission> for PermissionInfo {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id(),
            name: permission.name().to_owned(),
            description: permission.description().to_owned(),
        }
    }
}
