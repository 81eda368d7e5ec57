//! Defines the core data models and database queries for transactions.

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    cost_type::{CostType, CostTypeName},
    database_id::{CostTypeId, PersonId, TransactionId},
    db::LOWERCASE_FUNCTION,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income = 1,
    Expense = 2,
}

impl TransactionType {
    fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Income),
            2 => Some(Self::Expense),
            _ => None,
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(*self as i64))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let id = value.as_i64()?;
        Self::from_id(id).ok_or(FromSqlError::OutOfRange(id))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// A short label, e.g. the counterparty's name.
    pub name: String,
    pub description: String,
    /// Always positive, the direction comes from `transaction_type`.
    pub amount: f64,
    pub is_cash: bool,
    pub transaction_type: TransactionType,
    /// When the transaction happened.
    pub date: Date,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub submit_date: OffsetDateTime,
    /// When the transaction was last edited, if ever.
    #[serde(with = "time::serde::rfc3339::option")]
    pub update_date: Option<OffsetDateTime>,
    pub person_id: Option<PersonId>,
    pub cost_types: Vec<CostType>,
    /// Set for transactions imported from a bank statement.
    pub import_id: Option<i64>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: f64, date: Date, name: &str) -> TransactionBuilder {
        TransactionBuilder {
            name: name.to_owned(),
            description: String::new(),
            amount,
            is_cash: false,
            transaction_type: TransactionType::Expense,
            date,
            person_id: None,
            cost_type_ids: Vec::new(),
            import_id: None,
        }
    }
}

/// A builder for creating and replacing [Transaction]s.
///
/// Defaults to a non-cash expense with no description, person or cost types.
///
/// # Examples
///
/// ```ignore
/// use time::macros::date;
///
/// use crate::transaction::{Transaction, TransactionType};
///
/// let builder = Transaction::build(45.99, date!(2025 - 01 - 15), "Stationery")
///     .transaction_type(TransactionType::Expense)
///     .cost_type_ids(vec![3]);
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    pub name: String,
    pub description: String,
    pub amount: f64,
    pub is_cash: bool,
    pub transaction_type: TransactionType,
    pub date: Date,
    pub person_id: Option<PersonId>,
    pub cost_type_ids: Vec<CostTypeId>,
    /// Used to skip rows of a bank statement that were already imported.
    pub import_id: Option<i64>,
}

impl TransactionBuilder {
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    pub fn is_cash(mut self, is_cash: bool) -> Self {
        self.is_cash = is_cash;
        self
    }

    pub fn transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    pub fn person_id(mut self, person_id: Option<PersonId>) -> Self {
        self.person_id = person_id;
        self
    }

    pub fn cost_type_ids(mut self, cost_type_ids: Vec<CostTypeId>) -> Self {
        self.cost_type_ids = cost_type_ids;
        self
    }

    pub fn import_id(mut self, import_id: Option<i64>) -> Self {
        self.import_id = import_id;
        self
    }

    /// Check the amount and name, trimming the name.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if the amount is not a positive, finite
    /// number, or [Error::EmptyTransactionName] if the name is blank.
    fn validate(mut self) -> Result<Self, Error> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidAmount(self.amount));
        }

        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::EmptyTransactionName);
        }
        self.name = name.to_owned();

        self.cost_type_ids.sort_unstable();
        self.cost_type_ids.dedup();

        Ok(self)
    }
}

/// Request body for creating and editing a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub is_cash: bool,
    pub date: Date,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub person_id: Option<PersonId>,
    #[serde(default)]
    pub cost_type_ids: Vec<CostTypeId>,
}

impl From<TransactionData> for TransactionBuilder {
    fn from(data: TransactionData) -> Self {
        Transaction::build(data.amount, data.date, &data.name)
            .description(&data.description)
            .is_cash(data.is_cash)
            .transaction_type(data.transaction_type)
            .person_id(data.person_id)
            .cost_type_ids(data.cost_type_ids)
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// The transaction columns in the order [map_transaction_row] expects, for
/// queries that alias the transaction table as `t`.
pub(crate) const TRANSACTION_COLUMNS: &str = "t.id, t.name, t.description, t.amount, t.is_cash, \
    t.transaction_type, t.date, t.submit_date, t.update_date, t.person_id, t.import_id";

/// Create a new transaction in the database from a builder.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] or [Error::EmptyTransactionName] if the builder is invalid,
/// - [Error::PersonNotFound] if the person ID does not refer to a person,
/// - [Error::CostTypeNotFound] if a cost type ID does not refer to a cost type,
/// - [Error::DuplicateImportId] if a transaction with the import ID already exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let builder = builder.validate()?;

    let id: TransactionId = connection
        .prepare(
            "INSERT INTO \"transaction\"
                (name, description, amount, is_cash, transaction_type, date, submit_date, person_id, import_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             RETURNING id",
        )?
        .query_row(
            (
                &builder.name,
                &builder.description,
                builder.amount,
                builder.is_cash,
                builder.transaction_type,
                builder.date,
                OffsetDateTime::now_utc(),
                builder.person_id,
                builder.import_id,
            ),
            |row| row.get(0),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::PersonNotFound,
            error => error.into(),
        })?;

    add_transaction_cost_types(id, &builder.cost_type_ids, connection)?;

    get_transaction(id, connection)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::TransactionNotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t WHERE t.id = :id"
        ))?
        .query_row(&[(":id", &id)], map_transaction_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::TransactionNotFound,
            error => error.into(),
        })?;

    with_cost_types(transaction, connection)
}

/// Get all transactions, newest first.
pub fn get_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    query_transactions_with_cost_types(
        &format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t ORDER BY t.date DESC, t.id DESC"
        ),
        [],
        connection,
    )
}

/// Get the `count` most recent transactions, optionally of one type only.
pub fn get_last_transactions(
    count: u64,
    transaction_type: Option<TransactionType>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    query_transactions_with_cost_types(
        &format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t
            WHERE ?1 IS NULL OR t.transaction_type = ?1
            ORDER BY t.date DESC, t.id DESC
            LIMIT ?2"
        ),
        (transaction_type, i64::try_from(count).unwrap_or(i64::MAX)),
        connection,
    )
}

/// Get the transactions dated between `start` and `end` inclusive, oldest first.
pub fn get_transactions_in_range(
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    query_transactions_with_cost_types(
        &format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t
            WHERE t.date BETWEEN ?1 AND ?2
            ORDER BY t.date ASC, t.id ASC"
        ),
        (start, end),
        connection,
    )
}

/// Get a person's transactions, optionally only those dated on or after
/// `start` and on or before `end`, oldest first.
pub fn get_person_transactions(
    person_id: PersonId,
    start: Option<Date>,
    end: Option<Date>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    query_transactions_with_cost_types(
        &format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t
            WHERE t.person_id = ?1
                AND (?2 IS NULL OR t.date >= ?2)
                AND (?3 IS NULL OR t.date <= ?3)
            ORDER BY t.date ASC, t.id ASC"
        ),
        (person_id, start, end),
        connection,
    )
}

/// Replace every field of a transaction except its submit date and import ID.
///
/// Sets the update date to now and replaces the cost type set.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
///
/// # Errors
/// The same as [create_transaction], plus [Error::TransactionNotFound] if
/// `id` does not refer to a transaction.
pub fn update_transaction(
    id: TransactionId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let builder = builder.validate()?;

    let rows_affected = connection
        .execute(
            "UPDATE \"transaction\" SET name = ?1, description = ?2, amount = ?3, is_cash = ?4,
                transaction_type = ?5, date = ?6, person_id = ?7, update_date = ?8
            WHERE id = ?9",
            (
                &builder.name,
                &builder.description,
                builder.amount,
                builder.is_cash,
                builder.transaction_type,
                builder.date,
                builder.person_id,
                OffsetDateTime::now_utc(),
                id,
            ),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::PersonNotFound,
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::TransactionNotFound);
    }

    set_transaction_cost_types(id, &builder.cost_type_ids, connection)?;

    get_transaction(id, connection)
}

/// Rename a transaction and set its update date to now.
pub(crate) fn set_transaction_name(
    id: TransactionId,
    name: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyTransactionName);
    }

    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET name = ?1, update_date = ?2 WHERE id = ?3",
        (name, OffsetDateTime::now_utc(), id),
    )?;

    if rows_affected == 0 {
        return Err(Error::TransactionNotFound);
    }

    Ok(())
}

/// Replace the cost types of a transaction and set its update date to now.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
pub(crate) fn set_transaction_cost_types(
    id: TransactionId,
    cost_type_ids: &[CostTypeId],
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET update_date = ?1 WHERE id = ?2",
        (OffsetDateTime::now_utc(), id),
    )?;

    if rows_affected == 0 {
        return Err(Error::TransactionNotFound);
    }

    connection.execute(
        "DELETE FROM transaction_cost_type WHERE transaction_id = ?1",
        [id],
    )?;

    add_transaction_cost_types(id, cost_type_ids, connection)
}

/// Add cost types to a transaction, keeping the ones it already has.
///
/// # Errors
/// Returns [Error::CostTypeNotFound] if a cost type ID does not refer to a cost type.
pub(crate) fn add_transaction_cost_types(
    id: TransactionId,
    cost_type_ids: &[CostTypeId],
    connection: &Connection,
) -> Result<(), Error> {
    let mut statement = connection.prepare_cached(
        "INSERT OR IGNORE INTO transaction_cost_type (transaction_id, cost_type_id) VALUES (?1, ?2)",
    )?;

    for cost_type_id in cost_type_ids {
        statement
            .execute((id, cost_type_id))
            .map_err(|error| match error {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error {
                        code: _,
                        extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                    },
                    _,
                ) => Error::CostTypeNotFound,
                error => error.into(),
            })?;
    }

    Ok(())
}

/// Delete a transaction and its cost type links.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::TransactionNotFound);
    }

    Ok(())
}

/// Get up to ten distinct transaction names containing `query`, most used first.
pub fn autocomplete_transaction_names(
    query: &str,
    connection: &Connection,
) -> Result<Vec<String>, Error> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    connection
        .prepare(&format!(
            "SELECT name FROM \"transaction\"
            WHERE instr({LOWERCASE_FUNCTION}(name), ?1) > 0
            GROUP BY name
            ORDER BY COUNT(*) DESC, name ASC
            LIMIT 10"
        ))?
        .query_map([query], |row| row.get(0))?
        .map(|maybe_name| maybe_name.map_err(|error| error.into()))
        .collect()
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction and transaction cost type tables in the database.
///
/// The person and cost type tables must already exist.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            amount REAL NOT NULL,
            is_cash INTEGER NOT NULL DEFAULT 0,
            transaction_type INTEGER NOT NULL,
            date TEXT NOT NULL,
            submit_date TEXT NOT NULL,
            update_date TEXT,
            person_id INTEGER,
            import_id INTEGER UNIQUE,
            FOREIGN KEY(person_id) REFERENCES person(id)
        );

        CREATE TABLE IF NOT EXISTS transaction_cost_type (
            transaction_id INTEGER NOT NULL,
            cost_type_id INTEGER NOT NULL,
            PRIMARY KEY (transaction_id, cost_type_id),
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON DELETE CASCADE,
            FOREIGN KEY(cost_type_id) REFERENCES cost_type(id)
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);
        CREATE INDEX IF NOT EXISTS idx_transaction_person ON \"transaction\"(person_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_cost_type_cost_type
            ON transaction_cost_type(cost_type_id);",
    )?;

    Ok(())
}

/// Map a database row to a Transaction without its cost types.
///
/// The row must hold the columns of [TRANSACTION_COLUMNS] in order.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        is_cash: row.get(4)?,
        transaction_type: row.get(5)?,
        date: row.get(6)?,
        submit_date: row.get(7)?,
        update_date: row.get(8)?,
        person_id: row.get(9)?,
        cost_types: Vec::new(),
        import_id: row.get(10)?,
    })
}

/// Run a query selecting [TRANSACTION_COLUMNS] and fill in the cost types of each row.
pub(crate) fn query_transactions_with_cost_types<P: rusqlite::Params>(
    sql: &str,
    params: P,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let transactions = connection
        .prepare(sql)?
        .query_map(params, map_transaction_row)?
        .collect::<Result<Vec<_>, rusqlite::Error>>()?;

    transactions
        .into_iter()
        .map(|transaction| with_cost_types(transaction, connection))
        .collect()
}

fn with_cost_types(
    mut transaction: Transaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    transaction.cost_types = connection
        .prepare_cached(
            "SELECT c.id, c.name FROM transaction_cost_type tct
            INNER JOIN cost_type c ON c.id = tct.cost_type_id
            WHERE tct.transaction_id = ?1
            ORDER BY c.name ASC",
        )?
        .query_map([transaction.id], |row| {
            let raw_name: String = row.get(1)?;

            Ok(CostType {
                id: row.get(0)?,
                name: CostTypeName::new_unchecked(&raw_name),
            })
        })?
        .collect::<Result<Vec<_>, rusqlite::Error>>()?;

    Ok(transaction)
}

// ============================================================================
// TESTS
// ============================================================================
