//! Database operations for roles and their permissions.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    database_id::RoleId,
    permission::Permission,
    role::{ADMIN_ROLE, Role, RoleName, USER_ROLE, USER_ROLE_PERMISSIONS},
};

/// Create a role with the given permissions and return it with its generated ID.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateRoleName] if another role already uses `name`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_role(
    name: RoleName,
    description: &str,
    permissions: &[Permission],
    connection: &Connection,
) -> Result<Role, Error> {
    connection
        .execute(
            "INSERT INTO role (name, description) VALUES (?1, ?2)",
            (name.as_ref(), description),
        )
        .map_err(|error| map_unique_name_error(error, &name))?;

    let id = connection.last_insert_rowid();
    set_role_permissions(id, permissions, connection)?;

    get_role(id, connection)
}

/// Retrieve a role and its permissions by ID.
///
/// # Errors
/// Returns [Error::RoleNotFound] if `role_id` does not refer to a role.
pub fn get_role(role_id: RoleId, connection: &Connection) -> Result<Role, Error> {
    let (id, name, description) = connection
        .prepare("SELECT id, name, description FROM role WHERE id = :id")?
        .query_row(&[(":id", &role_id)], map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::RoleNotFound,
            error => error.into(),
        })?;

    Ok(Role {
        id,
        name,
        description,
        permissions: get_role_permissions(id, connection)?,
    })
}

/// Retrieve a role by its exact name.
///
/// # Errors
/// Returns [Error::RoleNotFound] if no role has the name `name`.
pub fn get_role_by_name(name: &str, connection: &Connection) -> Result<Role, Error> {
    let role_id: RoleId = connection
        .query_row("SELECT id FROM role WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::RoleNotFound,
            error => error.into(),
        })?;

    get_role(role_id, connection)
}

/// Retrieve all roles ordered alphabetically by name.
pub fn get_all_roles(connection: &Connection) -> Result<Vec<Role>, Error> {
    let rows = connection
        .prepare("SELECT id, name, description FROM role ORDER BY name ASC")?
        .query_map([], map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, name, description)| {
            Ok(Role {
                id,
                name,
                description,
                permissions: get_role_permissions(id, connection)?,
            })
        })
        .collect()
}

/// Get the permissions granted by a role, sorted by ID.
pub fn get_role_permissions(
    role_id: RoleId,
    connection: &Connection,
) -> Result<Vec<Permission>, Error> {
    connection
        .prepare(
            "SELECT permission_id FROM role_permission WHERE role_id = ?1 ORDER BY permission_id ASC",
        )?
        .query_map([role_id], |row| row.get(0))?
        .map(|maybe_permission| maybe_permission.map_err(|error| error.into()))
        .collect()
}

/// Replace a role's name, description and permissions.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
///
/// # Errors
/// This function will return a:
/// - [Error::RoleNotFound] if `role_id` does not refer to a role,
/// - or [Error::DuplicateRoleName] if another role already uses `name`.
pub fn update_role(
    role_id: RoleId,
    name: RoleName,
    description: &str,
    permissions: &[Permission],
    connection: &Connection,
) -> Result<Role, Error> {
    let rows_affected = connection
        .execute(
            "UPDATE role SET name = ?1, description = ?2 WHERE id = ?3",
            (name.as_ref(), description, role_id),
        )
        .map_err(|error| map_unique_name_error(error, &name))?;

    if rows_affected == 0 {
        return Err(Error::RoleNotFound);
    }

    set_role_permissions(role_id, permissions, connection)?;

    get_role(role_id, connection)
}

/// Replace the set of permissions granted by a role.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
///
/// # Errors
/// Returns [Error::RoleNotFound] if `role_id` does not refer to a role.
pub fn set_role_permissions(
    role_id: RoleId,
    permissions: &[Permission],
    connection: &Connection,
) -> Result<(), Error> {
    ensure_role_exists(role_id, connection)?;

    connection.execute("DELETE FROM role_permission WHERE role_id = ?1", [role_id])?;

    let mut statement = connection.prepare(
        "INSERT OR IGNORE INTO role_permission (role_id, permission_id) VALUES (?1, ?2)",
    )?;

    for permission in permissions {
        statement.execute((role_id, permission))?;
    }

    Ok(())
}

/// Delete a role by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::RoleInUse] if the role is assigned to any user,
/// - or [Error::RoleNotFound] if `role_id` does not refer to a role.
pub fn delete_role(role_id: RoleId, connection: &Connection) -> Result<(), Error> {
    let assigned_users: i64 = connection.query_row(
        "SELECT COUNT(*) FROM user_role WHERE role_id = ?1",
        [role_id],
        |row| row.get(0),
    )?;

    if assigned_users > 0 {
        return Err(Error::RoleInUse);
    }

    let rows_affected = connection.execute("DELETE FROM role WHERE id = ?1", [role_id])?;

    if rows_affected == 0 {
        return Err(Error::RoleNotFound);
    }

    Ok(())
}

/// Get the number of roles in the database.
pub fn count_roles(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM role;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Create the [ADMIN_ROLE] with every permission and the [USER_ROLE] if no roles exist yet.
pub fn seed_default_roles(connection: &Connection) -> Result<(), Error> {
    if count_roles(connection)? > 0 {
        return Ok(());
    }

    tracing::info!("Creating the default roles \"{ADMIN_ROLE}\" and \"{USER_ROLE}\"");

    create_role(
        RoleName::new_unchecked(ADMIN_ROLE),
        "Administrator with full access",
        &Permission::ALL,
        connection,
    )?;
    create_role(
        RoleName::new_unchecked(USER_ROLE),
        "Regular user with limited access",
        &USER_ROLE_PERMISSIONS,
        connection,
    )?;

    Ok(())
}

/// Initialize the role and role permission tables.
///
/// The permission table must already exist.
pub fn create_role_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS role (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS role_permission (
            role_id INTEGER NOT NULL,
            permission_id INTEGER NOT NULL,
            PRIMARY KEY (role_id, permission_id),
            FOREIGN KEY(role_id) REFERENCES role(id) ON DELETE CASCADE,
            FOREIGN KEY(permission_id) REFERENCES permission(id)
        );",
    )?;

    Ok(())
}

fn ensure_role_exists(role_id: RoleId, connection: &Connection) -> Result<(), Error> {
    let exists: bool = connection.query_row(
        "SELECT EXISTS (SELECT 1 FROM role WHERE id = ?1)",
        [role_id],
        |row| row.get(0),
    )?;

    if exists {
        Ok(())
    } else {
        Err(Error::RoleNotFound)
    }
}

fn map_unique_name_error(error: rusqlite::Error, name: &RoleName) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateRoleName(name.to_string()),
        error => error.into(),
    }
}

fn map_row(row: &Row) -> Result<(RoleId, RoleName, String), rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let description = row.get(2)?;

    Ok((id, RoleName::new_unchecked(&raw_name), description))
}
