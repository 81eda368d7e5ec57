//! Endpoints for creating, reading, updating and deleting transactions.

use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, State};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    ApiResponse, AppState, Error, PaginationConfig,
    database_id::TransactionId,
    extract::{Json, Path, Query},
    transaction::{
        QueryResult, Transaction, TransactionData, TransactionQuery, TransactionType,
        autocomplete_transaction_names, create_transaction, delete_transaction,
        get_all_transactions, get_last_transactions, get_transaction, query_transactions,
        update_transaction,
    },
};

/// The state needed by the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how to page query results.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LastTransactionsQuery {
    pub transaction_type: Option<TransactionType>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub query: String,
}

/// A route handler for creating a new transaction.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Json(data): Json<TransactionData>,
) -> Result<ApiResponse<Transaction>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let tx = connection.unchecked_transaction()?;

    let transaction = create_transaction(data.into(), &tx)?;
    tx.commit()?;

    tracing::debug!("Created transaction {}", transaction.id);

    Ok(ApiResponse::created(transaction))
}

/// All transactions, newest first.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
) -> Result<ApiResponse<Vec<Transaction>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_all_transactions(&connection).map(ApiResponse::success)
}

pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<ApiResponse<Transaction>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_transaction(transaction_id, &connection).map(ApiResponse::success)
}

/// A route handler for replacing a transaction.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
    Json(data): Json<TransactionData>,
) -> Result<ApiResponse<Transaction>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let tx = connection.unchecked_transaction()?;

    let transaction = update_transaction(transaction_id, data.into(), &tx)?;
    tx.commit()?;

    Ok(ApiResponse::success(transaction))
}

pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<ApiResponse<TransactionId>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    delete_transaction(transaction_id, &connection)?;

    Ok(ApiResponse::success(transaction_id))
}

/// The `count` most recent transactions, optionally of one type.
pub async fn get_last_transactions_endpoint(
    State(state): State<TransactionState>,
    Path(count): Path<u64>,
    Query(query): Query<LastTransactionsQuery>,
) -> Result<ApiResponse<Vec<Transaction>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_last_transactions(count, query.transaction_type, &connection).map(ApiResponse::success)
}

/// Suggest transaction names for a partially typed name.
pub async fn autocomplete_endpoint(
    State(state): State<TransactionState>,
    Query(query): Query<AutocompleteQuery>,
) -> Result<ApiResponse<Vec<String>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    autocomplete_transaction_names(&query.query, &connection).map(ApiResponse::success)
}

/// Filter, sort and page transactions.
pub async fn query_transactions_endpoint(
    State(state): State<TransactionState>,
    Json(query): Json<TransactionQuery>,
) -> Result<ApiResponse<QueryResult>, Error> {
    query.validate()?;
    let page = state
        .pagination_config
        .resolve(query.page, query.page_size);

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    query_transactions(&query, page, &connection).map(ApiResponse::success)
}
