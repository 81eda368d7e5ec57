//! Database operations for users and their role assignments.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error, PasswordHash,
    database_id::RoleId,
    role::{ADMIN_ROLE, get_role_by_name},
    user::{NewUser, User, UserID, UserProfile, UserUpdate, Username},
};

const USER_COLUMNS: &str = "id, username, first_name, last_name, email, password, is_active, \
    is_banned, created_at, last_login";

/// Create the user and user role tables.
///
/// The role table must already exist.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_banned INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            last_login TEXT
        );

        CREATE TABLE IF NOT EXISTS user_role (
            user_id INTEGER NOT NULL,
            role_id INTEGER NOT NULL,
            PRIMARY KEY (user_id, role_id),
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE,
            FOREIGN KEY(role_id) REFERENCES role(id)
        );",
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// New users are active, not banned and have no roles.
///
/// # Errors
///
/// This function will return a:
/// - [Error::UsernameTaken] if another user has the same username,
/// - [Error::EmailTaken] if another user has the same email,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO user (username, first_name, last_name, email, password, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                new_user.username.as_ref(),
                &new_user.first_name,
                &new_user.last_name,
                &new_user.email,
                new_user.password_hash.as_ref(),
                created_at,
            ),
        )
        .map_err(|error| map_unique_error(error, new_user.username.as_ref(), &new_user.email))?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: new_user.username,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
        email: new_user.email,
        password_hash: new_user.password_hash,
        is_active: true,
        is_banned: false,
        created_at,
        last_login: None,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// Returns [Error::UserNotFound] if `user_id` does not belong to a registered user.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_row)
        .map_err(map_not_found)
}

/// Get the user with the username `username`.
///
/// # Errors
///
/// Returns [Error::UserNotFound] if no user has the username.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user WHERE username = :username"
        ))?
        .query_row(&[(":username", &username)], map_row)
        .map_err(map_not_found)
}

/// Get all users ordered by username.
pub fn get_all_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user ORDER BY username ASC"
        ))?
        .query_map([], map_row)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// Get the user with their role names.
pub fn get_user_profile(user_id: UserID, connection: &Connection) -> Result<UserProfile, Error> {
    let user = get_user_by_id(user_id, connection)?;
    let roles = get_user_role_names(user_id, connection)?;

    Ok(UserProfile::new(user, roles))
}

/// Change the editable fields of a user.
///
/// # Errors
///
/// This function will return a:
/// - [Error::UserNotFound] if `user_id` does not belong to a registered user,
/// - or [Error::EmailTaken] if another user has the new email.
pub fn update_user(
    user_id: UserID,
    update: &UserUpdate,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE user SET email = ?1, first_name = ?2, last_name = ?3, is_active = ?4, is_banned = ?5
            WHERE id = ?6",
            (
                &update.email,
                &update.first_name,
                &update.last_name,
                update.is_active,
                update.is_banned,
                user_id.as_i64(),
            ),
        )
        .map_err(|error| map_unique_error(error, "", &update.email))?;

    if rows_affected == 0 {
        return Err(Error::UserNotFound);
    }

    Ok(())
}

/// Replace the password hash of a user.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UserNotFound);
    }

    Ok(())
}

/// Record that the user logged in at `when`.
pub fn record_log_in(
    user_id: UserID,
    when: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET last_login = ?1 WHERE id = ?2",
        (when, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UserNotFound);
    }

    Ok(())
}

/// Delete a user and their role assignments.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
pub fn delete_user(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM user_role WHERE user_id = ?1",
        [user_id.as_i64()],
    )?;
    let rows_affected = connection.execute("DELETE FROM user WHERE id = ?1", [user_id.as_i64()])?;

    if rows_affected == 0 {
        return Err(Error::UserNotFound);
    }

    Ok(())
}

/// Replace the roles assigned to a user.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::UserNotFound] if `user_id` does not belong to a registered user,
/// - or [Error::RoleNotFound] if any of `role_ids` does not refer to a role.
pub fn set_user_roles(
    user_id: UserID,
    role_ids: &[RoleId],
    connection: &Connection,
) -> Result<(), Error> {
    // Checked up front so a missing user is not reported as a missing role.
    get_user_by_id(user_id, connection)?;

    connection.execute(
        "DELETE FROM user_role WHERE user_id = ?1",
        [user_id.as_i64()],
    )?;

    let mut statement = connection
        .prepare("INSERT OR IGNORE INTO user_role (user_id, role_id) VALUES (?1, ?2)")?;

    for role_id in role_ids {
        statement
            .execute((user_id.as_i64(), role_id))
            .map_err(|error| match error {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error {
                        code: _,
                        extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                    },
                    _,
                ) => Error::RoleNotFound,
                error => error.into(),
            })?;
    }

    Ok(())
}

/// Get the names of the roles assigned to a user, sorted by name.
pub fn get_user_role_names(user_id: UserID, connection: &Connection) -> Result<Vec<String>, Error> {
    connection
        .prepare(
            "SELECT role.name FROM user_role
            INNER JOIN role ON role.id = user_role.role_id
            WHERE user_role.user_id = ?1
            ORDER BY role.name ASC",
        )?
        .query_map([user_id.as_i64()], |row| row.get(0))?
        .map(|maybe_name| maybe_name.map_err(|error| error.into()))
        .collect()
}

/// Create the administrator account, or reset it if it already exists.
///
/// The user ends up active, not banned, with the password hash
/// `password_hash` and holding the Admin role (in addition to any roles they
/// already had).
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
pub fn upsert_admin_user(
    username: &str,
    email: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<UserID, Error> {
    let user_id = match get_user_by_username(username, connection) {
        Ok(user) => {
            update_password(user.id, &password_hash, connection)?;
            update_user(
                user.id,
                &UserUpdate {
                    email: user.email,
                    first_name: user.first_name,
                    last_name: user.last_name,
                    is_active: true,
                    is_banned: false,
                },
                connection,
            )?;
            user.id
        }
        Err(Error::UserNotFound) => {
            create_user(
                NewUser {
                    username: Username::new(username)?,
                    first_name: "Admin".to_owned(),
                    last_name: "User".to_owned(),
                    email: email.to_owned(),
                    password_hash,
                },
                connection,
            )?
            .id
        }
        Err(error) => return Err(error),
    };

    let admin_role = get_role_by_name(ADMIN_ROLE, connection)?;
    connection.execute(
        "INSERT OR IGNORE INTO user_role (user_id, role_id) VALUES (?1, ?2)",
        (user_id.as_i64(), admin_role.id),
    )?;

    Ok(user_id)
}

fn map_unique_error(error: rusqlite::Error, username: &str, email: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
            if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && desc.ends_with("user.username") =>
        {
            Error::UsernameTaken(username.to_owned())
        }
        rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
            if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && desc.ends_with("user.email") =>
        {
            Error::EmailTaken(email.to_owned())
        }
        error => error.into(),
    }
}

fn map_not_found(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::QueryReturnedNoRows => Error::UserNotFound,
        error => error.into(),
    }
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_username: String = row.get(1)?;
    let raw_password_hash: String = row.get(5)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        username: Username::new_unchecked(&raw_username),
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        is_active: row.get(6)?,
        is_banned: row.get(7)?,
        created_at: row.get(8)?,
        last_login: row.get(9)?,
    })
}

#[cfg(test)]
mod user_db_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error, PasswordHash,
        db::initialize,
        role::{ADMIN_ROLE, USER_ROLE, get_role_by_name},
        test_utils::{create_test_user, new_test_user},
        user::{
            UserID, UserUpdate, create_user, delete_user, get_all_users, get_user_by_id,
            get_user_by_username, get_user_profile, get_user_role_names, record_log_in,
            set_user_roles, update_user, upsert_admin_user,
        },
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn create_user_succeeds() {
        let connection = get_test_connection();

        let user = create_user(new_test_user("alice"), &connection).unwrap();

        assert!(user.id.as_i64() > 0);
        assert!(user.is_active);
        assert!(!user.is_banned);
        let got = get_user_by_id(user.id, &connection).unwrap();
        assert_eq!(got.username, user.username);
        assert_eq!(got.email, user.email);
        assert_eq!(got.password_hash, user.password_hash);
        assert!((got.created_at - user.created_at).abs() < Duration::seconds(1));
        assert_eq!(got.last_login, None);
    }

    #[test]
    fn create_user_fails_on_duplicate_username() {
        let connection = get_test_connection();
        create_test_user("alice", &connection);
        let mut duplicate = new_test_user("alice");
        duplicate.email = "other@example.com".to_owned();

        let result = create_user(duplicate, &connection);

        assert_eq!(result, Err(Error::UsernameTaken("alice".to_owned())));
    }

    #[test]
    fn create_user_fails_on_duplicate_email() {
        let connection = get_test_connection();
        create_test_user("alice", &connection);
        let mut duplicate = new_test_user("bob");
        duplicate.email = "alice@example.com".to_owned();

        let result = create_user(duplicate, &connection);

        assert_eq!(result, Err(Error::EmailTaken("alice@example.com".to_owned())));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let connection = get_test_connection();

        assert_eq!(
            get_user_by_id(UserID::new(42), &connection),
            Err(Error::UserNotFound)
        );
    }

    #[test]
    fn get_all_users_orders_by_username() {
        let connection = get_test_connection();
        create_test_user("carol", &connection);
        create_test_user("alice", &connection);

        let names: Vec<String> = get_all_users(&connection)
            .unwrap()
            .into_iter()
            .map(|user| user.username.to_string())
            .collect();

        assert_eq!(names, vec!["alice", "carol"]);
    }

    #[test]
    fn update_user_fails_on_taken_email() {
        let connection = get_test_connection();
        create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);

        let result = update_user(
            bob.id,
            &UserUpdate {
                email: "alice@example.com".to_owned(),
                first_name: String::new(),
                last_name: String::new(),
                is_active: true,
                is_banned: false,
            },
            &connection,
        );

        assert_eq!(result, Err(Error::EmailTaken("alice@example.com".to_owned())));
    }

    #[test]
    fn record_log_in_sets_last_login() {
        let connection = get_test_connection();
        let user = create_test_user("alice", &connection);
        let now = OffsetDateTime::now_utc();

        record_log_in(user.id, now, &connection).unwrap();

        let got = get_user_by_id(user.id, &connection).unwrap();
        let last_login = got.last_login.expect("last login should be set");
        assert!((last_login - now).abs() < Duration::seconds(1));
    }

    #[test]
    fn set_user_roles_replaces_roles() {
        let connection = get_test_connection();
        let user = create_test_user("alice", &connection);
        let admin = get_role_by_name(ADMIN_ROLE, &connection).unwrap();
        let regular = get_role_by_name(USER_ROLE, &connection).unwrap();

        set_user_roles(user.id, &[admin.id], &connection).unwrap();
        set_user_roles(user.id, &[regular.id], &connection).unwrap();

        assert_eq!(
            get_user_role_names(user.id, &connection).unwrap(),
            vec![USER_ROLE.to_owned()]
        );
    }

    #[test]
    fn set_user_roles_with_unknown_role_fails() {
        let connection = get_test_connection();
        let user = create_test_user("alice", &connection);

        let result = set_user_roles(user.id, &[999], &connection);

        assert_eq!(result, Err(Error::RoleNotFound));
    }

    #[test]
    fn set_user_roles_for_missing_user_fails() {
        let connection = get_test_connection();

        let result = set_user_roles(UserID::new(999), &[1], &connection);

        assert_eq!(result, Err(Error::UserNotFound));
    }

    #[test]
    fn delete_user_removes_role_links() {
        let connection = get_test_connection();
        let user = create_test_user("alice", &connection);
        let admin = get_role_by_name(ADMIN_ROLE, &connection).unwrap();
        set_user_roles(user.id, &[admin.id], &connection).unwrap();

        delete_user(user.id, &connection).unwrap();

        assert_eq!(get_user_by_id(user.id, &connection), Err(Error::UserNotFound));
        assert_eq!(get_user_role_names(user.id, &connection).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn upsert_admin_creates_then_resets_admin() {
        let connection = get_test_connection();

        let first_id = upsert_admin_user(
            "admin",
            "admin@example.com",
            PasswordHash::new_unchecked("first"),
            &connection,
        )
        .unwrap();
        let second_id = upsert_admin_user(
            "admin",
            "ignored@example.com",
            PasswordHash::new_unchecked("second"),
            &connection,
        )
        .unwrap();

        assert_eq!(first_id, second_id);
        let admin = get_user_by_username("admin", &connection).unwrap();
        assert_eq!(admin.password_hash, PasswordHash::new_unchecked("second"));
        assert_eq!(admin.email, "admin@example.com");
        let profile = get_user_profile(admin.id, &connection).unwrap();
        assert_eq!(profile.roles, vec![ADMIN_ROLE.to_owned()]);
    }
}
