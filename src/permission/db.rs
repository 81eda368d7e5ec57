//! Database operations for permissions.

use rusqlite::Connection;

use crate::{Error, permission::Permission, user::UserID};

/// Create the permission table and store every [Permission].
///
/// Existing rows are left untouched so this can run on every start-up.
pub fn create_permission_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS permission (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL
        )",
        (),
    )?;

    let mut statement = connection
        .prepare("INSERT OR IGNORE INTO permission (id, name, description) VALUES (?1, ?2, ?3)")?;

    for permission in Permission::ALL {
        statement.execute((permission, permission.name(), permission.description()))?;
    }

    Ok(())
}

/// Get the effective permissions of a user.
///
/// This is the union of the permissions of every role assigned to the user,
/// sorted by permission ID.
pub fn get_user_permissions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Permission>, Error> {
    connection
        .prepare(
            "SELECT DISTINCT role_permission.permission_id
            FROM user_role
            INNER JOIN role_permission ON role_permission.role_id = user_role.role_id
            WHERE user_role.user_id = ?1
            ORDER BY role_permission.permission_id ASC",
        )?
        .query_map([user_id.as_i64()], |row| row.get(0))?
        .map(|maybe_permission| maybe_permission.map_err(|error| error.into()))
        .collect()
}

/// Check whether any role assigned to the user grants `permission`.
pub fn user_has_permission(
    user_id: UserID,
    permission: Permission,
    connection: &Connection,
) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS (
                SELECT 1 FROM user_role
                INNER JOIN role_permission ON role_permission.role_id = user_role.role_id
                WHERE user_role.user_id = ?1 AND role_permission.permission_id = ?2
            )",
            (user_id.as_i64(), permission),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

#[cfg(test)]
mod permission_db_tests {
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        permission::{Permission, get_user_permissions, user_has_permission},
        role::{RoleName, create_role},
        test_utils::create_test_user,
        user::set_user_roles,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn every_permission_is_stored() {
        let connection = get_test_connection();

        let count: u32 = connection
            .query_row("SELECT COUNT(*) FROM permission", [], |row| row.get(0))
            .unwrap();

        assert_eq!(count as usize, Permission::ALL.len());
    }

    #[test]
    fn user_without_roles_has_no_permissions() {
        let connection = get_test_connection();
        let user = create_test_user("alice", &connection);

        let got = get_user_permissions(user.id, &connection).unwrap();

        assert!(got.is_empty());
        assert!(!user_has_permission(user.id, Permission::ViewTransactions, &connection).unwrap());
    }

    #[test]
    fn permissions_are_union_of_roles() {
        let connection = get_test_connection();
        let user = create_test_user("alice", &connection);
        let viewer = create_role(
            RoleName::new_unchecked("Viewer"),
            "",
            &[Permission::ViewTransactions, Permission::ViewPersons],
            &connection,
        )
        .unwrap();
        let editor = create_role(
            RoleName::new_unchecked("Editor"),
            "",
            &[Permission::ViewTransactions, Permission::EditTransaction],
            &connection,
        )
        .unwrap();
        set_user_roles(user.id, &[viewer.id, editor.id], &connection).unwrap();

        let got = get_user_permissions(user.id, &connection).unwrap();

        assert_eq!(
            got,
            vec![
                Permission::ViewTransactions,
                Permission::EditTransaction,
                Permission::ViewPersons
            ]
        );
        assert!(user_has_permission(user.id, Permission::EditTransaction, &connection).unwrap());
        assert!(!user_has_permission(user.id, Permission::DeletePerson, &connection).unwrap());
    }
}
