//! Database operations for cost types.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    cost_type::{CostType, CostTypeName},
    database_id::CostTypeId,
};

/// Create a cost type and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::DuplicateCostTypeName] if another cost type has the same name.
pub fn create_cost_type(name: CostTypeName, connection: &Connection) -> Result<CostType, Error> {
    connection
        .execute("INSERT INTO cost_type (name) VALUES (?1);", (name.as_ref(),))
        .map_err(|error| map_unique_error(error, &name))?;

    let id = connection.last_insert_rowid();

    Ok(CostType { id, name })
}

/// Retrieve a single cost type by ID.
///
/// # Errors
///
/// Returns [Error::CostTypeNotFound] if `cost_type_id` does not refer to a cost type.
pub fn get_cost_type(cost_type_id: CostTypeId, connection: &Connection) -> Result<CostType, Error> {
    connection
        .prepare("SELECT id, name FROM cost_type WHERE id = :id;")?
        .query_row(&[(":id", &cost_type_id)], map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::CostTypeNotFound,
            error => error.into(),
        })
}

/// Retrieve all cost types ordered alphabetically by name.
pub fn get_all_cost_types(connection: &Connection) -> Result<Vec<CostType>, Error> {
    connection
        .prepare("SELECT id, name FROM cost_type ORDER BY name ASC;")?
        .query_map([], map_row)?
        .map(|maybe_cost_type| maybe_cost_type.map_err(|error| error.into()))
        .collect()
}

/// Rename a cost type.
///
/// # Errors
///
/// Returns [Error::CostTypeNotFound] if the cost type doesn't exist, or
/// [Error::DuplicateCostTypeName] if the new name is taken.
pub fn update_cost_type(
    cost_type_id: CostTypeId,
    new_name: CostTypeName,
    connection: &Connection,
) -> Result<CostType, Error> {
    let rows_affected = connection
        .execute(
            "UPDATE cost_type SET name = ?1 WHERE id = ?2",
            (new_name.as_ref(), cost_type_id),
        )
        .map_err(|error| map_unique_error(error, &new_name))?;

    if rows_affected == 0 {
        return Err(Error::CostTypeNotFound);
    }

    Ok(CostType {
        id: cost_type_id,
        name: new_name,
    })
}

/// Delete a cost type by ID.
///
/// # Errors
///
/// Returns [Error::CostTypeHasTransactions] if a transaction carries the cost
/// type, or [Error::CostTypeNotFound] if it doesn't exist.
pub fn delete_cost_type(cost_type_id: CostTypeId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM cost_type WHERE id = ?1", [cost_type_id])
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::CostTypeHasTransactions,
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::CostTypeNotFound);
    }

    Ok(())
}

/// Initialize the cost type table and indexes.
pub fn create_cost_type_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS cost_type (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );

        CREATE INDEX IF NOT EXISTS idx_cost_type_name ON cost_type(name);",
    )?;

    Ok(())
}

fn map_unique_error(error: rusqlite::Error, name: &CostTypeName) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateCostTypeName(name.to_string()),
        error => error.into(),
    }
}

fn map_row(row: &Row) -> Result<CostType, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let name = CostTypeName::new_unchecked(&raw_name);

    Ok(CostType { id, name })
}

#[cfg(test)]
mod cost_type_query_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        cost_type::{
            CostTypeName, create_cost_type, delete_cost_type, get_all_cost_types, get_cost_type,
            update_cost_type,
        },
        db::initialize,
        transaction::{Transaction, create_transaction},
    };

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn create_and_get_cost_type() {
        let connection = get_test_db_connection();
        let name = CostTypeName::new("Rent").unwrap();

        let cost_type = create_cost_type(name.clone(), &connection).unwrap();

        assert!(cost_type.id > 0);
        assert_eq!(cost_type.name, name);
        assert_eq!(get_cost_type(cost_type.id, &connection), Ok(cost_type));
    }

    #[test]
    fn create_fails_on_duplicate_name() {
        let connection = get_test_db_connection();
        create_cost_type(CostTypeName::new_unchecked("Rent"), &connection).unwrap();

        let result = create_cost_type(CostTypeName::new_unchecked("Rent"), &connection);

        assert_eq!(result, Err(Error::DuplicateCostTypeName("Rent".to_owned())));
    }

    #[test]
    fn get_missing_cost_type_fails() {
        let connection = get_test_db_connection();

        assert_eq!(get_cost_type(42, &connection), Err(Error::CostTypeNotFound));
    }

    #[test]
    fn get_all_orders_by_name() {
        let connection = get_test_db_connection();
        create_cost_type(CostTypeName::new_unchecked("Wages"), &connection).unwrap();
        create_cost_type(CostTypeName::new_unchecked("Fuel"), &connection).unwrap();

        let names: Vec<String> = get_all_cost_types(&connection)
            .unwrap()
            .into_iter()
            .map(|cost_type| cost_type.name.to_string())
            .collect();

        assert_eq!(names, vec!["Fuel", "Wages"]);
    }

    #[test]
    fn update_renames_cost_type() {
        let connection = get_test_db_connection();
        let cost_type = create_cost_type(CostTypeName::new_unchecked("Fule"), &connection).unwrap();

        update_cost_type(cost_type.id, CostTypeName::new_unchecked("Fuel"), &connection).unwrap();

        let got = get_cost_type(cost_type.id, &connection).unwrap();
        assert_eq!(got.name.as_ref(), "Fuel");
    }

    #[test]
    fn update_missing_cost_type_fails() {
        let connection = get_test_db_connection();

        let result = update_cost_type(7, CostTypeName::new_unchecked("Fuel"), &connection);

        assert_eq!(result, Err(Error::CostTypeNotFound));
    }

    #[test]
    fn delete_fails_while_transactions_use_cost_type() {
        let connection = get_test_db_connection();
        let cost_type = create_cost_type(CostTypeName::new_unchecked("Fuel"), &connection).unwrap();
        create_transaction(
            Transaction::build(20.0, date!(2025 - 03 - 01), "Petrol")
                .cost_type_ids(vec![cost_type.id]),
            &connection,
        )
        .unwrap();

        let result = delete_cost_type(cost_type.id, &connection);

        assert_eq!(result, Err(Error::CostTypeHasTransactions));
    }

    #[test]
    fn delete_unused_cost_type() {
        let connection = get_test_db_connection();
        let cost_type = create_cost_type(CostTypeName::new_unchecked("Fuel"), &connection).unwrap();

        delete_cost_type(cost_type.id, &connection).unwrap();

        assert_eq!(
            delete_cost_type(cost_type.id, &connection),
            Err(Error::CostTypeNotFound)
        );
    }
}
