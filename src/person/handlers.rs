//! Endpoints for managing persons and viewing their balances.

use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, State};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    ApiResponse, AppState, Error,
    database_id::PersonId,
    extract::{Json, Path, Query},
    person::{
        Person, PersonData, PersonName, create_person, delete_person, get_all_persons,
        get_person, update_person,
    },
    report::{FinancialSummary, financial_summary},
    transaction::{DateRangeQuery, Transaction, get_person_transactions},
};

/// The state needed by the person endpoints.
#[derive(Debug, Clone)]
pub struct PersonState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PersonState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A person's transactions and what they owe or are owed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonStatement {
    pub person: Person,
    pub transactions: Vec<Transaction>,
    /// Income from the person minus expenses paid to them.
    pub balance: f64,
    #[serde(flatten)]
    pub summary: FinancialSummary,
}

/// List all persons ordered by name.
pub async fn list_persons_endpoint(
    State(state): State<PersonState>,
) -> Result<ApiResponse<Vec<Person>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_all_persons(&connection).map(ApiResponse::success)
}

pub async fn get_person_endpoint(
    State(state): State<PersonState>,
    Path(person_id): Path<PersonId>,
) -> Result<ApiResponse<Person>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_person(person_id, &connection).map(ApiResponse::success)
}

pub async fn create_person_endpoint(
    State(state): State<PersonState>,
    Json(data): Json<PersonData>,
) -> Result<ApiResponse<Person>, Error> {
    let name = PersonName::new(&data.name)?;
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let person = create_person(name, data.details, &connection)?;
    tracing::info!("Created person \"{}\"", person.name);

    Ok(ApiResponse::created(person))
}

pub async fn update_person_endpoint(
    State(state): State<PersonState>,
    Path(person_id): Path<PersonId>,
    Json(data): Json<PersonData>,
) -> Result<ApiResponse<Person>, Error> {
    let name = PersonName::new(&data.name)?;
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    update_person(person_id, name, data.details, &connection).map(ApiResponse::success)
}

/// Delete a person that no transaction refers to.
pub async fn delete_person_endpoint(
    State(state): State<PersonState>,
    Path(person_id): Path<PersonId>,
) -> Result<ApiResponse<PersonId>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    delete_person(person_id, &connection)?;

    Ok(ApiResponse::success(person_id))
}

/// The balance over all of a person's transactions.
pub async fn get_person_balance_endpoint(
    State(state): State<PersonState>,
    Path(person_id): Path<PersonId>,
) -> Result<ApiResponse<PersonStatement>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    build_statement(person_id, DateRangeQuery::default(), &connection).map(ApiResponse::success)
}

/// The balance over a person's transactions between two dates, inclusive.
pub async fn get_person_transactions_endpoint(
    State(state): State<PersonState>,
    Path(person_id): Path<PersonId>,
    Query(query): Query<DateRangeQuery>,
) -> Result<ApiResponse<PersonStatement>, Error> {
    query.validate()?;
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    build_statement(person_id, query, &connection).map(ApiResponse::success)
}

fn build_statement(
    person_id: PersonId,
    query: DateRangeQuery,
    connection: &Connection,
) -> Result<PersonStatement, Error> {
    let person = get_person(person_id, connection)?;
    let transactions =
        get_person_transactions(person_id, query.start_date, query.end_date, connection)?;
    let summary = financial_summary(&transactions);

    Ok(PersonStatement {
        person,
        transactions,
        balance: summary.financial_balance,
        summary,
    })
}

#[cfg(test)]
mod person_endpoint_tests {
    use axum::extract::State;
    use time::macros::date;

    use crate::{
        Error,
        extract::{Json, Path, Query},
        person::{PersonData, PersonDetails},
        test_utils::get_test_db_connection,
        transaction::{DateRangeQuery, Transaction, TransactionType, create_transaction},
    };

    use super::{
        PersonState, create_person_endpoint, delete_person_endpoint, get_person_balance_endpoint,
        get_person_endpoint, get_person_transactions_endpoint, list_persons_endpoint,
        update_person_endpoint,
    };

    fn get_state() -> PersonState {
        PersonState {
            db_connection: get_test_db_connection(),
        }
    }

    fn data(name: &str) -> Json<PersonData> {
        Json(PersonData {
            name: name.to_owned(),
            details: PersonDetails::default(),
        })
    }

    #[tokio::test]
    async fn create_then_list() {
        let state = get_state();

        let response = create_person_endpoint(State(state.clone()), data(" Acme "))
            .await
            .unwrap();

        assert_eq!(response.code, 201);
        let listed = list_persons_endpoint(State(state)).await.unwrap().data.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name.as_ref(), "Acme");
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let result = create_person_endpoint(State(get_state()), data("  ")).await;

        assert_eq!(result.unwrap_err(), Error::EmptyPersonName);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let state = get_state();
        let person = create_person_endpoint(State(state.clone()), data("Acme"))
            .await
            .unwrap()
            .data
            .unwrap();

        let updated = update_person_endpoint(State(state.clone()), Path(person.id), data("Acme 2"))
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(updated.name.as_ref(), "Acme 2");

        delete_person_endpoint(State(state.clone()), Path(person.id))
            .await
            .unwrap();
        let result = get_person_endpoint(State(state), Path(person.id)).await;
        assert_eq!(result.unwrap_err(), Error::PersonNotFound);
    }

    #[tokio::test]
    async fn balance_adds_income_and_subtracts_expenses() {
        let state = get_state();
        let person = create_person_endpoint(State(state.clone()), data("Acme"))
            .await
            .unwrap()
            .data
            .unwrap();
        {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(
                Transaction::build(500.0, date!(2025 - 05 - 01), "Invoice paid")
                    .transaction_type(TransactionType::Income)
                    .person_id(Some(person.id)),
                &connection,
            )
            .unwrap();
            create_transaction(
                Transaction::build(120.0, date!(2025 - 05 - 20), "Refund")
                    .person_id(Some(person.id)),
                &connection,
            )
            .unwrap();
            create_transaction(
                Transaction::build(9999.0, date!(2025 - 05 - 20), "Someone else"),
                &connection,
            )
            .unwrap();
        }

        let statement = get_person_balance_endpoint(State(state.clone()), Path(person.id))
            .await
            .unwrap()
            .data
            .unwrap();
        let may_only = get_person_transactions_endpoint(
            State(state),
            Path(person.id),
            Query(DateRangeQuery {
                start_date: Some(date!(2025 - 05 - 01)),
                end_date: Some(date!(2025 - 05 - 10)),
            }),
        )
        .await
        .unwrap()
        .data
        .unwrap();

        assert_eq!(statement.transactions.len(), 2);
        assert_eq!(statement.balance, 380.0);
        assert_eq!(may_only.transactions.len(), 1);
        assert_eq!(may_only.balance, 500.0);
    }

    #[tokio::test]
    async fn transactions_reject_reversed_range() {
        let result = get_person_transactions_endpoint(
            State(get_state()),
            Path(1),
            Query(DateRangeQuery {
                start_date: Some(date!(2025 - 05 - 10)),
                end_date: Some(date!(2025 - 05 - 01)),
            }),
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidDateRange(_, _))));
    }

    #[tokio::test]
    async fn balance_of_unknown_person_fails() {
        let result = get_person_balance_endpoint(State(get_state()), Path(42)).await;

        assert_eq!(result.unwrap_err(), Error::PersonNotFound);
    }
}
