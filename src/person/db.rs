//! Database operations for persons.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Error,
    database_id::PersonId,
    person::{Person, PersonDetails, PersonName},
};

const PERSON_COLUMNS: &str =
    "id, name, contact_number, account_number, bank_name, person_type, description";

/// Create a person and return it with its generated ID.
pub fn create_person(
    name: PersonName,
    details: PersonDetails,
    connection: &Connection,
) -> Result<Person, Error> {
    connection.execute(
        "INSERT INTO person (name, contact_number, account_number, bank_name, person_type, description)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            name.as_ref(),
            &details.contact_number,
            &details.account_number,
            &details.bank_name,
            &details.person_type,
            &details.description,
        ),
    )?;

    Ok(Person {
        id: connection.last_insert_rowid(),
        name,
        details,
    })
}

/// Retrieve a person by ID.
///
/// # Errors
///
/// Returns [Error::PersonNotFound] if `person_id` does not refer to a person.
pub fn get_person(person_id: PersonId, connection: &Connection) -> Result<Person, Error> {
    connection
        .prepare(&format!("SELECT {PERSON_COLUMNS} FROM person WHERE id = :id"))?
        .query_row(&[(":id", &person_id)], map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::PersonNotFound,
            error => error.into(),
        })
}

/// Retrieve all persons ordered alphabetically by name.
pub fn get_all_persons(connection: &Connection) -> Result<Vec<Person>, Error> {
    connection
        .prepare(&format!(
            "SELECT {PERSON_COLUMNS} FROM person ORDER BY name ASC, id ASC"
        ))?
        .query_map([], map_row)?
        .map(|maybe_person| maybe_person.map_err(|error| error.into()))
        .collect()
}

/// Find the person whose account number is `account_number`, ignoring
/// persons without one.
///
/// If several persons share the account number the oldest one is returned.
pub fn get_person_by_account_number(
    account_number: &str,
    connection: &Connection,
) -> Result<Option<Person>, Error> {
    let account_number = account_number.trim();
    if account_number.is_empty() {
        return Ok(None);
    }

    connection
        .prepare_cached(&format!(
            "SELECT {PERSON_COLUMNS} FROM person WHERE account_number = ?1 ORDER BY id ASC LIMIT 1"
        ))?
        .query_row([account_number], map_row)
        .optional()
        .map_err(|error| error.into())
}

/// Replace the name and details of a person.
///
/// # Errors
///
/// Returns [Error::PersonNotFound] if `person_id` does not refer to a person.
pub fn update_person(
    person_id: PersonId,
    name: PersonName,
    details: PersonDetails,
    connection: &Connection,
) -> Result<Person, Error> {
    let rows_affected = connection.execute(
        "UPDATE person SET name = ?1, contact_number = ?2, account_number = ?3, bank_name = ?4,
            person_type = ?5, description = ?6
        WHERE id = ?7",
        (
            name.as_ref(),
            &details.contact_number,
            &details.account_number,
            &details.bank_name,
            &details.person_type,
            &details.description,
            person_id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::PersonNotFound);
    }

    Ok(Person {
        id: person_id,
        name,
        details,
    })
}

/// Delete a person by ID.
///
/// # Errors
///
/// Returns [Error::PersonHasTransactions] if a transaction refers to the
/// person, or [Error::PersonNotFound] if they don't exist.
pub fn delete_person(person_id: PersonId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM person WHERE id = ?1", [person_id])
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::PersonHasTransactions,
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::PersonNotFound);
    }

    Ok(())
}

/// Initialize the person table and indexes.
pub fn create_person_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS person (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            contact_number TEXT NOT NULL DEFAULT '',
            account_number TEXT NOT NULL DEFAULT '',
            bank_name TEXT NOT NULL DEFAULT '',
            person_type TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_person_account_number ON person(account_number);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Person, rusqlite::Error> {
    let raw_name: String = row.get(1)?;

    Ok(Person {
        id: row.get(0)?,
        name: PersonName::new_unchecked(&raw_name),
        details: PersonDetails {
            contact_number: row.get(2)?,
            account_number: row.get(3)?,
            bank_name: row.get(4)?,
            person_type: row.get(5)?,
            description: row.get(6)?,
        },
    })
}
