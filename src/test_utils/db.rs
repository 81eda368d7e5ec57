use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    PasswordHash, ValidatedPassword,
    db::initialize,
    permission::Permission,
    role::{RoleName, create_role},
    user::{NewUser, User, Username, create_user, set_user_roles},
};

pub(crate) const TEST_PASSWORD: &str = "ledger-quail-tangerine-91";

pub(crate) fn get_test_db_connection() -> Arc<Mutex<Connection>> {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database");
    initialize(&connection).expect("Could not initialize database");

    Arc::new(Mutex::new(connection))
}

pub(crate) fn new_test_user(username: &str) -> NewUser {
    NewUser {
        username: Username::new_unchecked(username),
        first_name: "Test".to_owned(),
        last_name: "User".to_owned(),
        email: format!("{username}@example.com"),
        password_hash: PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4)
            .expect("Could not hash password"),
    }
}

pub(crate) fn create_test_user(username: &str, connection: &Connection) -> User {
    create_user(new_test_user(username), connection).expect("Could not create test user")
}

/// Give `user` a fresh role holding exactly `permissions`.
pub(crate) fn grant_permissions(user: &User, permissions: &[Permission], connection: &Connection) {
    let role = create_role(
        RoleName::new_unchecked(&format!("role for {}", user.username)),
        "",
        permissions,
        connection,
    )
    .expect("Could not create role");
    set_user_roles(user.id, &[role.id], connection).expect("Could not assign role");
}
