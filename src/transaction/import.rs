//! Importing transactions from bank statement CSV files.
//!
//! A statement has the header `row,date,description,card_holder,deposit,withdrawal,card_number`.
//! Each row is either a deposit (income) or a withdrawal (expense). Every row
//! gets an import ID hashed from its contents so that uploading the same
//! statement twice does not create duplicate transactions.

use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, Multipart, State, multipart::Field};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    ApiResponse, AppState, Error,
    person::get_person_by_account_number,
    transaction::{Transaction, TransactionType, create_transaction},
};

const EXPECTED_HEADERS: [&str; 7] = [
    "row",
    "date",
    "description",
    "card_holder",
    "deposit",
    "withdrawal",
    "card_number",
];

const DATE_COLUMN: usize = 1;
const DESCRIPTION_COLUMN: usize = 2;
const CARD_HOLDER_COLUMN: usize = 3;
const DEPOSIT_COLUMN: usize = 4;
const WITHDRAWAL_COLUMN: usize = 5;
const CARD_NUMBER_COLUMN: usize = 6;

const DATE_FORMATS: [&[BorrowedFormatItem]; 2] = [
    format_description!("[year]-[month]-[day]"),
    format_description!("[year]/[month]/[day]"),
];

/// The state needed for importing transactions.
#[derive(Debug, Clone)]
pub struct ImportState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Rows stored as new transactions.
    pub imported: usize,
    /// Rows that were already imported by an earlier upload.
    pub skipped_duplicates: usize,
    /// Rows without a usable date or amount.
    pub skipped_invalid: usize,
}

/// A statement row ready to be stored.
#[derive(Debug, Clone, PartialEq)]
struct StatementRow {
    name: String,
    description: String,
    amount: f64,
    transaction_type: TransactionType,
    date: Date,
    card_number: String,
    import_id: i64,
}

/// The valid rows of a statement and how many rows were unusable.
#[derive(Debug, Default, PartialEq)]
struct ParsedStatement {
    rows: Vec<StatementRow>,
    skipped_invalid: usize,
}

/// Route handler for importing transactions from CSV files.
///
/// Every file is parsed before anything is stored, and all rows are stored
/// in one SQL transaction.
pub async fn import_transactions_endpoint(
    State(state): State<ImportState>,
    mut multipart: Multipart,
) -> Result<ApiResponse<ImportSummary>, Error> {
    let start_time = std::time::Instant::now();
    let mut statements = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|error| {
        tracing::error!("Could not read multipart form field: {error}");
        Error::MultipartError(error.body_text())
    })? {
        let csv_data = parse_multipart_field(field).await?;
        let statement = parse_statement(&csv_data)
            .inspect_err(|error| tracing::debug!("Failed to parse CSV: {error}"))?;
        statements.push(statement);
    }

    if statements.is_empty() {
        return Err(Error::MultipartError("no files were uploaded".to_owned()));
    }

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let tx = connection.unchecked_transaction()?;

    let mut summary = ImportSummary::default();
    for statement in statements {
        let stored = store_statement_rows(&statement.rows, &tx)?;
        summary.imported += stored.imported;
        summary.skipped_duplicates += stored.skipped_duplicates;
        summary.skipped_invalid += statement.skipped_invalid;
    }

    tx.commit()?;

    tracing::info!(
        "Imported {} transactions in {}ms, skipped {} duplicates and {} invalid rows",
        summary.imported,
        start_time.elapsed().as_millis(),
        summary.skipped_duplicates,
        summary.skipped_invalid
    );

    Ok(ApiResponse::created(summary))
}

async fn parse_multipart_field(field: Field<'_>) -> Result<String, Error> {
    if field.content_type() != Some("text/csv") {
        return Err(Error::NotCSV);
    }

    let file_name = match field.file_name() {
        Some(file_name) => file_name.to_owned(),
        None => {
            tracing::error!("Could not get file name from multipart form field: {field:#?}");
            return Err(Error::MultipartError(
                "Could not get file name from multipart form field".to_owned(),
            ));
        }
    };
    let data = match field.text().await {
        Ok(data) => data,
        Err(error) => {
            tracing::error!("Could not read data from multipart form field: {error}");
            return Err(Error::MultipartError(
                "Could not read data from multipart form field.".to_owned(),
            ));
        }
    };

    tracing::debug!("Received file '{}' that is {} bytes", file_name, data.len());

    Ok(data)
}

/// Parse a bank statement, counting the rows that cannot be imported.
///
/// # Errors
///
/// Returns [Error::InvalidCSV] if the header does not match or a line is not valid CSV.
fn parse_statement(text: &str) -> Result<ParsedStatement, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| Error::InvalidCSV(error.to_string()))?;
    let headers_match = headers.len() == EXPECTED_HEADERS.len()
        && headers
            .iter()
            .zip(EXPECTED_HEADERS)
            .all(|(header, expected)| {
                header
                    .trim_start_matches('\u{feff}')
                    .eq_ignore_ascii_case(expected)
            });
    if !headers_match {
        return Err(Error::InvalidCSV(format!(
            "expected the header '{}'",
            EXPECTED_HEADERS.join(",")
        )));
    }

    let mut statement = ParsedStatement::default();
    for record in reader.records() {
        let record = record.map_err(|error| Error::InvalidCSV(error.to_string()))?;

        if record.iter().all(str::is_empty) {
            continue;
        }

        match parse_row(&record) {
            Some(row) => statement.rows.push(row),
            None => {
                tracing::debug!("Skipping invalid statement row: {record:?}");
                statement.skipped_invalid += 1;
            }
        }
    }

    Ok(statement)
}

fn parse_row(record: &csv::StringRecord) -> Option<StatementRow> {
    let field = |index: usize| record.get(index).unwrap_or_default();

    let date = parse_date(field(DATE_COLUMN))?;
    let deposit = parse_amount(field(DEPOSIT_COLUMN))?;
    let withdrawal = parse_amount(field(WITHDRAWAL_COLUMN))?;

    let (amount, transaction_type) = if deposit > 0.0 {
        (deposit, TransactionType::Income)
    } else if withdrawal > 0.0 {
        (withdrawal, TransactionType::Expense)
    } else {
        return None;
    };

    let description = field(DESCRIPTION_COLUMN).to_owned();
    let name = match field(CARD_HOLDER_COLUMN) {
        "" => description.clone(),
        card_holder => card_holder.to_owned(),
    };
    if name.is_empty() {
        return None;
    }

    let line = record.iter().collect::<Vec<_>>().join(",");

    Some(StatementRow {
        name,
        description,
        amount,
        transaction_type,
        date,
        card_number: field(CARD_NUMBER_COLUMN).to_owned(),
        import_id: create_import_id(&line),
    })
}

fn parse_date(text: &str) -> Option<Date> {
    DATE_FORMATS
        .iter()
        .find_map(|format| Date::parse(text, format).ok())
}

/// Parse an amount, where an empty cell means zero.
fn parse_amount(text: &str) -> Option<f64> {
    let text = text.replace(',', "");
    if text.is_empty() {
        return Some(0.0);
    }

    text.parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
}

/// Creates a hash for a statement row from its contents.
///
/// Only the first 64 bits of the MD5 digest are kept so the ID fits in an SQLite integer.
pub fn create_import_id(csv_line: &str) -> i64 {
    let hash_128 = md5::compute(csv_line);
    let mut hash_64 = [0; 8];
    hash_64.copy_from_slice(&hash_128[0..8]);
    i64::from_le_bytes(hash_64)
}

/// Store statement rows, ignoring rows whose import ID already exists.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
fn store_statement_rows(
    rows: &[StatementRow],
    connection: &Connection,
) -> Result<ImportSummary, Error> {
    let mut summary = ImportSummary::default();

    for row in rows {
        let person_id =
            get_person_by_account_number(&row.card_number, connection)?.map(|person| person.id);
        let builder = Transaction::build(row.amount, row.date, &row.name)
            .description(&row.description)
            .transaction_type(row.transaction_type)
            .person_id(person_id)
            .import_id(Some(row.import_id));

        match create_transaction(builder, connection) {
            Ok(_) => summary.imported += 1,
            Err(Error::DuplicateImportId) => summary.skipped_duplicates += 1,
            Err(error) => return Err(error),
        }
    }

    Ok(summary)
}
