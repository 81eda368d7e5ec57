//! Core user domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash, database_id::RoleId};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A validated, non-empty username.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Username(String);

impl Username {
    /// Create a username, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyUsername] if `username` is empty or only whitespace.
    pub fn new(username: &str) -> Result<Self, Error> {
        let username = username.trim();

        if username.is_empty() {
            Err(Error::EmptyUsername)
        } else {
            Ok(Self(username.to_owned()))
        }
    }

    /// Create a username without validation.
    pub fn new_unchecked(username: &str) -> Self {
        Self(username.to_owned())
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user of the application, as stored in the database.
///
/// Never serialized directly, see [UserProfile] for the JSON view.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserID,
    pub username: Username,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: PasswordHash,
    pub is_active: bool,
    pub is_banned: bool,
    pub created_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

impl User {
    /// Check that the user may log in and keep using their session.
    ///
    /// # Errors
    ///
    /// Returns [Error::UserBanned] or [Error::UserInactive].
    pub fn ensure_can_log_in(&self) -> Result<(), Error> {
        if self.is_banned {
            return Err(Error::UserBanned);
        }

        if !self.is_active {
            return Err(Error::UserInactive);
        }

        Ok(())
    }
}

/// The fields needed to insert a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: PasswordHash,
}

/// The fields of a user that can be changed after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_banned: bool,
}

/// The JSON view of a user with their role names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserID,
    pub username: Username,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    pub is_banned: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    pub roles: Vec<String>,
}

impl UserProfile {
    /// Combine a stored user with the names of their roles.
    pub fn new(user: User, roles: Vec<String>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            is_active: user.is_active,
            is_banned: user.is_banned,
            created_at: user.created_at,
            last_login: user.last_login,
            roles,
        }
    }
}

/// Request body for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserData {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
}

/// Request body for editing a user.
///
/// The roles are left unchanged when `role_ids` is omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserData {
    #[serde(flatten)]
    pub update: UserUpdate,
    #[serde(default)]
    pub role_ids: Option<Vec<RoleId>>,
}

/// Request body for replacing a user's roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRolesData {
    pub user_id: UserID,
    pub role_ids: Vec<RoleId>,
}
