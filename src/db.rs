//! Sets up the application's SQLite database.

use rusqlite::{
    Connection, Transaction as SqlTransaction, TransactionBehavior, functions::FunctionFlags,
};

use crate::{
    Error,
    cost_type::create_cost_type_table,
    permission::create_permission_table,
    person::create_person_table,
    role::{create_role_tables, seed_default_roles},
    transaction::create_transaction_tables,
    user::create_user_tables,
};

/// The SQL function that lowercases text the same way as [str::to_lowercase].
///
/// SQLite's built-in `LOWER` only folds ASCII letters.
pub(crate) const LOWERCASE_FUNCTION: &str = "unicode_lower";

/// Create the tables for the domain models if they do not exist yet and
/// seed the permissions and default roles.
///
/// Also registers the application's SQL functions on `connection`.
/// Safe to call on every start-up.
///
/// # Errors
/// Returns an error if a table cannot be created or seeded.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;
    register_functions(connection)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_permission_table(&transaction)?;
    create_role_tables(&transaction)?;
    create_user_tables(&transaction)?;
    create_person_table(&transaction)?;
    create_cost_type_table(&transaction)?;
    create_transaction_tables(&transaction)?;
    seed_default_roles(&transaction)?;

    transaction.commit()?;

    Ok(())
}

fn register_functions(connection: &Connection) -> Result<(), Error> {
    connection.create_scalar_function(
        LOWERCASE_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |context| Ok(context.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
    )?;

    Ok(())
}

#[cfg(test)]
mod db_tests {
    use rusqlite::Connection;

    use crate::role::get_all_roles;

    use super::{LOWERCASE_FUNCTION, initialize};

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();
        initialize(&connection).unwrap();

        let roles = get_all_roles(&connection).unwrap();
        assert_eq!(roles.len(), 2);
    }

    #[test]
    fn initialize_enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let enabled: bool = connection
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(enabled);
    }

    #[test]
    fn lowercase_function_folds_non_ascii_letters() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let (lowered, null): (String, Option<String>) = connection
            .query_row(
                &format!("SELECT {LOWERCASE_FUNCTION}('ÄPFEL Straße'), {LOWERCASE_FUNCTION}(NULL)"),
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();

        assert_eq!(lowered, "äpfel straße");
        assert_eq!(null, None);
    }
}
