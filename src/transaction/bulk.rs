//! Editing many transactions in one request.

use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, State};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    ApiResponse, AppState, Error,
    database_id::{CostTypeId, TransactionId},
    extract::Json,
    transaction::{
        DateRange, Transaction,
        core::{
            TRANSACTION_COLUMNS, add_transaction_cost_types, get_transaction,
            query_transactions_with_cost_types, set_transaction_cost_types, set_transaction_name,
        },
    },
};

/// The state needed for editing many transactions at once.
#[derive(Debug, Clone)]
pub struct BulkEditState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BulkEditState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The change applied to every selected transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkChange {
    /// Replace the cost types.
    CostTypes(Vec<CostTypeId>),
    /// Rename.
    Name(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkEditData {
    pub transaction_ids: Vec<TransactionId>,
    pub change: BulkChange,
}

/// Request body for adding cost types to transactions by keyword.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyCostTypesData {
    /// Matched case-insensitively against transaction descriptions.
    pub keywords: Vec<String>,
    #[serde(default)]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub end_date: Option<Date>,
    pub cost_type_ids: Vec<CostTypeId>,
}

/// Apply `change` to each transaction in `transaction_ids`.
///
/// Stops at the first transaction that cannot be changed, so pass in a
/// transaction for `connection` to make the edit all or nothing.
///
/// # Errors
///
/// Returns [Error::EmptyBulkSelection] if no transactions are selected,
/// [Error::EmptyCostTypeSelection] or [Error::EmptyTransactionName] if the
/// change is empty, or [Error::TransactionNotFound] if an ID is unknown.
pub fn bulk_edit_transactions(
    transaction_ids: &[TransactionId],
    change: &BulkChange,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    if transaction_ids.is_empty() {
        return Err(Error::EmptyBulkSelection);
    }

    match change {
        BulkChange::CostTypes(cost_type_ids) if cost_type_ids.is_empty() => {
            return Err(Error::EmptyCostTypeSelection);
        }
        BulkChange::Name(name) if name.trim().is_empty() => {
            return Err(Error::EmptyTransactionName);
        }
        _ => {}
    }

    let mut transaction_ids = transaction_ids.to_vec();
    transaction_ids.sort_unstable();
    transaction_ids.dedup();

    transaction_ids
        .into_iter()
        .map(|id| {
            match change {
                BulkChange::CostTypes(cost_type_ids) => {
                    set_transaction_cost_types(id, cost_type_ids, connection)?
                }
                BulkChange::Name(name) => set_transaction_name(id, name, connection)?,
            }

            get_transaction(id, connection)
        })
        .collect()
}

/// Add cost types to every transaction whose description contains one of `keywords`.
///
/// Only transactions dated within the optional start and end dates are
/// changed. Cost types a transaction already has are kept.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
///
/// # Errors
///
/// Returns [Error::EmptyCostTypeSelection] if no cost types are given,
/// [Error::InvalidDateRange] if the start date is after the end date, or
/// [Error::CostTypeNotFound] if a cost type ID is unknown.
pub fn apply_cost_types_by_keyword(
    data: &ApplyCostTypesData,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    if data.cost_type_ids.is_empty() {
        return Err(Error::EmptyCostTypeSelection);
    }

    if let (Some(start), Some(end)) = (data.start_date, data.end_date) {
        DateRange::new(start, end)?;
    }

    let keywords: Vec<String> = data
        .keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect();
    if keywords.is_empty() {
        return Ok(Vec::new());
    }

    let candidates = query_transactions_with_cost_types(
        &format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t
            WHERE (?1 IS NULL OR t.date >= ?1) AND (?2 IS NULL OR t.date <= ?2)
            ORDER BY t.date ASC, t.id ASC"
        ),
        (data.start_date, data.end_date),
        connection,
    )?;

    candidates
        .into_iter()
        .filter(|transaction| {
            let description = transaction.description.to_lowercase();
            keywords
                .iter()
                .any(|keyword| description.contains(keyword.as_str()))
        })
        .map(|transaction| {
            add_transaction_cost_types(transaction.id, &data.cost_type_ids, connection)?;
            get_transaction(transaction.id, connection)
        })
        .collect()
}

/// Apply one change to many transactions, all or nothing.
pub async fn bulk_edit_endpoint(
    State(state): State<BulkEditState>,
    Json(data): Json<BulkEditData>,
) -> Result<ApiResponse<Vec<Transaction>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let tx = connection.unchecked_transaction()?;

    let transactions = bulk_edit_transactions(&data.transaction_ids, &data.change, &tx)?;
    tx.commit()?;

    tracing::info!("Bulk edited {} transactions", transactions.len());

    Ok(ApiResponse::success(transactions))
}

/// Add cost types to transactions by keyword, all or nothing.
pub async fn apply_cost_types_endpoint(
    State(state): State<BulkEditState>,
    Json(data): Json<ApplyCostTypesData>,
) -> Result<ApiResponse<Vec<Transaction>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let tx = connection.unchecked_transaction()?;

    let transactions = apply_cost_types_by_keyword(&data, &tx)?;
    tx.commit()?;

    tracing::info!("Applied cost types to {} transactions", transactions.len());

    Ok(ApiResponse::success(transactions))
}

#[cfg(test)]
mod bulk_edit_tests {
    use axum::extract::State;
    use serde_json::json;
    use time::macros::date;

    use crate::{
        Error,
        extract::Json,
        cost_type::{CostType, CostTypeName, create_cost_type},
        test_utils::get_test_db_connection,
        transaction::{Transaction, create_transaction, get_transaction},
    };

    use super::{
        ApplyCostTypesData, BulkChange, BulkEditData, BulkEditState, apply_cost_types_endpoint,
        bulk_edit_endpoint,
    };

    fn get_state() -> BulkEditState {
        BulkEditState {
            db_connection: get_test_db_connection(),
        }
    }

    fn seed(state: &BulkEditState, descriptions: &[&str]) -> Vec<Transaction> {
        let connection = state.db_connection.lock().unwrap();
        descriptions
            .iter()
            .map(|description| {
                create_transaction(
                    Transaction::build(10.0, date!(2025 - 04 - 01), "Payee")
                        .description(description),
                    &connection,
                )
                .unwrap()
            })
            .collect()
    }

    fn cost_type(state: &BulkEditState, name: &str) -> CostType {
        let connection = state.db_connection.lock().unwrap();
        create_cost_type(CostTypeName::new_unchecked(name), &connection).unwrap()
    }

    #[test]
    fn change_uses_externally_tagged_json() {
        let change: BulkChange = serde_json::from_value(json!({"cost_types": [1, 2]})).unwrap();
        let rename: BulkChange = serde_json::from_value(json!({"name": "Rent"})).unwrap();

        assert_eq!(change, BulkChange::CostTypes(vec![1, 2]));
        assert_eq!(rename, BulkChange::Name("Rent".to_owned()));
    }

    #[tokio::test]
    async fn replaces_cost_types_of_every_selected_transaction() {
        let state = get_state();
        let transactions = seed(&state, &["a", "b", "c"]);
        let fuel = cost_type(&state, "Fuel");

        let response = bulk_edit_endpoint(
            State(state.clone()),
            Json(BulkEditData {
                transaction_ids: vec![transactions[0].id, transactions[1].id],
                change: BulkChange::CostTypes(vec![fuel.id]),
            }),
        )
        .await
        .unwrap();

        let updated = response.data.unwrap();
        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|t| t.cost_types == vec![fuel.clone()]));
        let connection = state.db_connection.lock().unwrap();
        assert!(
            get_transaction(transactions[2].id, &connection)
                .unwrap()
                .cost_types
                .is_empty()
        );
    }

    #[tokio::test]
    async fn renames_selected_transactions() {
        let state = get_state();
        let transactions = seed(&state, &["a", "b"]);

        let response = bulk_edit_endpoint(
            State(state),
            Json(BulkEditData {
                transaction_ids: transactions.iter().map(|t| t.id).collect(),
                change: BulkChange::Name("  Landlord ".to_owned()),
            }),
        )
        .await
        .unwrap();

        let updated = response.data.unwrap();
        assert!(updated.iter().all(|t| t.name == "Landlord"));
        assert!(updated.iter().all(|t| t.update_date.is_some()));
    }

    #[tokio::test]
    async fn missing_transaction_rolls_back_everything() {
        let state = get_state();
        let transactions = seed(&state, &["a"]);

        let result = bulk_edit_endpoint(
            State(state.clone()),
            Json(BulkEditData {
                transaction_ids: vec![transactions[0].id, 999],
                change: BulkChange::Name("Renamed".to_owned()),
            }),
        )
        .await;

        assert_eq!(result.unwrap_err(), Error::TransactionNotFound);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(
            get_transaction(transactions[0].id, &connection).unwrap().name,
            "Payee"
        );
    }

    #[tokio::test]
    async fn empty_selections_are_rejected() {
        let state = get_state();
        let transactions = seed(&state, &["a"]);

        let no_transactions = bulk_edit_endpoint(
            State(state.clone()),
            Json(BulkEditData {
                transaction_ids: vec![],
                change: BulkChange::Name("x".to_owned()),
            }),
        )
        .await;
        let no_cost_types = bulk_edit_endpoint(
            State(state.clone()),
            Json(BulkEditData {
                transaction_ids: vec![transactions[0].id],
                change: BulkChange::CostTypes(vec![]),
            }),
        )
        .await;
        let blank_name = bulk_edit_endpoint(
            State(state),
            Json(BulkEditData {
                transaction_ids: vec![transactions[0].id],
                change: BulkChange::Name(" ".to_owned()),
            }),
        )
        .await;

        assert_eq!(no_transactions.unwrap_err(), Error::EmptyBulkSelection);
        assert_eq!(no_cost_types.unwrap_err(), Error::EmptyCostTypeSelection);
        assert_eq!(blank_name.unwrap_err(), Error::EmptyTransactionName);
    }

    #[tokio::test]
    async fn applies_cost_types_by_description_keyword() {
        let state = get_state();
        let transactions = seed(&state, &["Z Energy petrol", "PETROL top up", "Groceries"]);
        let fuel = cost_type(&state, "Fuel");
        let travel = cost_type(&state, "Travel");
        {
            let connection = state.db_connection.lock().unwrap();
            crate::transaction::add_transaction_cost_types(
                transactions[0].id,
                &[travel.id],
                &connection,
            )
            .unwrap();
        }

        let response = apply_cost_types_endpoint(
            State(state),
            Json(ApplyCostTypesData {
                keywords: vec!["petrol".to_owned(), "  ".to_owned()],
                start_date: None,
                end_date: None,
                cost_type_ids: vec![fuel.id],
            }),
        )
        .await
        .unwrap();

        let updated = response.data.unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0].cost_types, vec![fuel.clone(), travel]);
        assert_eq!(updated[1].cost_types, vec![fuel]);
    }

    #[tokio::test]
    async fn apply_cost_types_respects_date_range() {
        let state = get_state();
        seed(&state, &["petrol"]);
        let fuel = cost_type(&state, "Fuel");

        let outside = apply_cost_types_endpoint(
            State(state.clone()),
            Json(ApplyCostTypesData {
                keywords: vec!["petrol".to_owned()],
                start_date: Some(date!(2025 - 05 - 01)),
                end_date: None,
                cost_type_ids: vec![fuel.id],
            }),
        )
        .await
        .unwrap();
        let reversed = apply_cost_types_endpoint(
            State(state),
            Json(ApplyCostTypesData {
                keywords: vec!["petrol".to_owned()],
                start_date: Some(date!(2025 - 05 - 01)),
                end_date: Some(date!(2025 - 04 - 01)),
                cost_type_ids: vec![fuel.id],
            }),
        )
        .await;

        assert_eq!(outside.data.unwrap().len(), 0);
        assert!(matches!(reversed, Err(Error::InvalidDateRange(_, _))));
    }
}
