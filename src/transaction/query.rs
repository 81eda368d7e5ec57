//! Filtering, sorting and paging of transactions.

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{CostTypeId, PersonId},
    db::LOWERCASE_FUNCTION,
    pagination::Page,
    transaction::{
        DateRange, Transaction, TransactionType,
        core::{TRANSACTION_COLUMNS, query_transactions_with_cost_types},
    },
};

/// The column to sort query results by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Date,
    Amount,
    Name,
    SubmitDate,
}

impl SortBy {
    fn column(self) -> &'static str {
        match self {
            SortBy::Date => "t.date",
            SortBy::Amount => "t.amount",
            SortBy::Name => "t.name",
            SortBy::SubmitDate => "t.submit_date",
        }
    }
}

/// The order to sort transactions in a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    #[serde(rename = "asc")]
    Ascending,
    /// Sort in order of decreasing value.
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// The filters, sort and page of a transaction query.
///
/// Every filter is optional and filters are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionQuery {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub person_id: Option<PersonId>,
    /// Match transactions that have any of these cost types.
    pub cost_type_ids: Vec<CostTypeId>,
    /// Only match transactions without cost types, ignoring `cost_type_ids`.
    pub uncategorized: bool,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub is_cash: Option<bool>,
    pub transaction_type: Option<TransactionType>,
    /// Case-insensitive text to find in the name or description.
    pub search: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// One page of query results with totals over every matching transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub transactions: Vec<Transaction>,
    pub total_income: f64,
    pub total_expense: f64,
    /// Income minus expenses.
    pub balance: f64,
    /// The number of matching transactions across all pages.
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
}

/// An SQL `WHERE` clause and the values bound to its placeholders.
#[derive(Debug, Default)]
struct Filter {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    fn push(&mut self, condition: &str, values: impl IntoIterator<Item = Value>) {
        self.conditions.push(condition.to_owned());
        self.params.extend(values);
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

impl TransactionQuery {
    /// Check the ranges of the query.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidDateRange] if the start date is after the end date,
    /// or [Error::InvalidAmountRange] if the minimum amount is above the maximum.
    pub fn validate(&self) -> Result<(), Error> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            DateRange::new(start, end)?;
        }

        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount)
            && min > max
        {
            return Err(Error::InvalidAmountRange(min, max));
        }

        Ok(())
    }

    fn filter(&self) -> Filter {
        let mut filter = Filter::default();

        if let Some(start) = self.start_date {
            filter.push("t.date >= ?", [Value::Text(start.to_string())]);
        }

        if let Some(end) = self.end_date {
            filter.push("t.date <= ?", [Value::Text(end.to_string())]);
        }

        if let Some(person_id) = self.person_id {
            filter.push("t.person_id = ?", [Value::Integer(person_id)]);
        }

        if self.uncategorized {
            filter.push(
                "NOT EXISTS (SELECT 1 FROM transaction_cost_type tct WHERE tct.transaction_id = t.id)",
                [],
            );
        } else if !self.cost_type_ids.is_empty() {
            let placeholders = vec!["?"; self.cost_type_ids.len()].join(", ");
            filter.push(
                &format!(
                    "t.id IN (SELECT tct.transaction_id FROM transaction_cost_type tct \
                    WHERE tct.cost_type_id IN ({placeholders}))"
                ),
                self.cost_type_ids.iter().copied().map(Value::Integer),
            );
        }

        if let Some(min_amount) = self.min_amount {
            filter.push("t.amount >= ?", [Value::Real(min_amount)]);
        }

        if let Some(max_amount) = self.max_amount {
            filter.push("t.amount <= ?", [Value::Real(max_amount)]);
        }

        if let Some(is_cash) = self.is_cash {
            filter.push("t.is_cash = ?", [Value::Integer(i64::from(is_cash))]);
        }

        if let Some(transaction_type) = self.transaction_type {
            filter.push(
                "t.transaction_type = ?",
                [Value::Integer(transaction_type as i64)],
            );
        }

        if let Some(search) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty())
        {
            let search = search.to_lowercase();
            filter.push(
                &format!(
                    "(instr({LOWERCASE_FUNCTION}(t.name), ?) > 0 \
                    OR instr({LOWERCASE_FUNCTION}(t.description), ?) > 0)"
                ),
                [Value::Text(search.clone()), Value::Text(search)],
            );
        }

        filter
    }
}

/// Run `query` against the transactions in the database.
///
/// The totals cover every matching transaction while `transactions` only
/// holds the requested page. Rows with equal sort keys are ordered by ID in
/// the same direction so paging is stable.
///
/// # Errors
///
/// Returns the errors of [TransactionQuery::validate], or [Error::SqlError]
/// if the query fails.
pub fn query_transactions(
    query: &TransactionQuery,
    page: Page,
    connection: &Connection,
) -> Result<QueryResult, Error> {
    query.validate()?;

    let filter = query.filter();
    let where_clause = filter.where_clause();

    let (total, total_income, total_expense): (i64, f64, f64) = connection
        .prepare(&format!(
            "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN t.transaction_type = {income} THEN t.amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN t.transaction_type = {expense} THEN t.amount ELSE 0 END), 0)
            FROM \"transaction\" t
            {where_clause}",
            income = TransactionType::Income as i64,
            expense = TransactionType::Expense as i64,
        ))?
        .query_row(params_from_iter(filter.params.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;

    let direction = query.sort_order.keyword();
    let mut page_params = filter.params;
    page_params.push(Value::Integer(page.limit()));
    page_params.push(Value::Integer(page.offset()));

    let transactions = query_transactions_with_cost_types(
        &format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t
            {where_clause}
            ORDER BY {column} {direction}, t.id {direction}
            LIMIT ? OFFSET ?",
            column = query.sort_by.column(),
        ),
        params_from_iter(page_params.iter()),
        connection,
    )?;

    let total = u64::try_from(total).unwrap_or_default();

    Ok(QueryResult {
        transactions,
        total_income,
        total_expense,
        balance: total_income - total_expense,
        total,
        total_pages: page.count_pages(total),
        current_page: page.number,
        page_size: page.size,
    })
}

#[cfg(test)]
mod query_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        cost_type::{CostTypeName, create_cost_type},
        db::initialize,
        pagination::PaginationConfig,
        person::{PersonDetails, PersonName, create_person},
        transaction::{Transaction, TransactionType, create_transaction},
    };

    use super::{SortBy, SortOrder, TransactionQuery, query_transactions};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn run(query: &TransactionQuery, connection: &Connection) -> super::QueryResult {
        let page = PaginationConfig::default().resolve(query.page, query.page_size);
        query_transactions(query, page, connection).unwrap()
    }

    fn names(result: &super::QueryResult) -> Vec<&str> {
        result
            .transactions
            .iter()
            .map(|transaction| transaction.name.as_str())
            .collect()
    }

    #[test]
    fn empty_query_returns_everything_newest_first() {
        let connection = get_test_connection();
        create_transaction(
            Transaction::build(10.0, date!(2025 - 01 - 01), "first"),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build(20.0, date!(2025 - 01 - 02), "second")
                .transaction_type(TransactionType::Income),
            &connection,
        )
        .unwrap();

        let result = run(&TransactionQuery::default(), &connection);

        assert_eq!(names(&result), vec!["second", "first"]);
        assert_eq!(result.total, 2);
        assert_eq!(result.total_income, 20.0);
        assert_eq!(result.total_expense, 10.0);
        assert_eq!(result.balance, 10.0);
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.current_page, 1);
        assert_eq!(result.page_size, 25);
    }

    #[test]
    fn totals_cover_all_pages() {
        let connection = get_test_connection();
        for day in 1..=5 {
            create_transaction(
                Transaction::build(
                    10.0,
                    date!(2025 - 01 - 01).replace_day(day).unwrap(),
                    &format!("day {day}"),
                ),
                &connection,
            )
            .unwrap();
        }
        let query = TransactionQuery {
            page: Some(2),
            page_size: Some(2),
            ..Default::default()
        };

        let result = run(&query, &connection);

        assert_eq!(names(&result), vec!["day 3", "day 2"]);
        assert_eq!(result.total, 5);
        assert_eq!(result.total_expense, 50.0);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.current_page, 2);
    }

    #[test]
    fn ties_break_by_id_in_sort_direction() {
        let connection = get_test_connection();
        for name in ["a", "b", "c"] {
            create_transaction(
                Transaction::build(5.0, date!(2025 - 01 - 01), name),
                &connection,
            )
            .unwrap();
        }

        let ascending = run(
            &TransactionQuery {
                sort_by: SortBy::Amount,
                sort_order: SortOrder::Ascending,
                ..Default::default()
            },
            &connection,
        );
        let descending = run(
            &TransactionQuery {
                sort_by: SortBy::Amount,
                ..Default::default()
            },
            &connection,
        );

        assert_eq!(names(&ascending), vec!["a", "b", "c"]);
        assert_eq!(names(&descending), vec!["c", "b", "a"]);
    }

    #[test]
    fn filters_by_cost_types_and_uncategorized() {
        let connection = get_test_connection();
        let fuel = create_cost_type(CostTypeName::new_unchecked("Fuel"), &connection).unwrap();
        let rent = create_cost_type(CostTypeName::new_unchecked("Rent"), &connection).unwrap();
        let food = create_cost_type(CostTypeName::new_unchecked("Food"), &connection).unwrap();
        let day = date!(2025 - 01 - 01);
        create_transaction(
            Transaction::build(1.0, day, "petrol").cost_type_ids(vec![fuel.id]),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build(2.0, day, "office").cost_type_ids(vec![rent.id, fuel.id]),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build(3.0, day, "lunch").cost_type_ids(vec![food.id]),
            &connection,
        )
        .unwrap();
        create_transaction(Transaction::build(4.0, day, "misc"), &connection).unwrap();

        let any_of = run(
            &TransactionQuery {
                cost_type_ids: vec![fuel.id, rent.id],
                sort_by: SortBy::Amount,
                sort_order: SortOrder::Ascending,
                ..Default::default()
            },
            &connection,
        );
        let uncategorized = run(
            &TransactionQuery {
                cost_type_ids: vec![fuel.id],
                uncategorized: true,
                ..Default::default()
            },
            &connection,
        );

        assert_eq!(names(&any_of), vec!["petrol", "office"]);
        assert_eq!(names(&uncategorized), vec!["misc"]);
    }

    #[test]
    fn filters_by_amount_type_cash_person_and_dates() {
        let connection = get_test_connection();
        let person = create_person(
            PersonName::new_unchecked("Acme"),
            PersonDetails::default(),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build(50.0, date!(2025 - 02 - 10), "match")
                .transaction_type(TransactionType::Income)
                .is_cash(true)
                .person_id(Some(person.id)),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build(50.0, date!(2025 - 02 - 10), "wrong type").is_cash(true),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build(500.0, date!(2025 - 02 - 10), "too big")
                .transaction_type(TransactionType::Income)
                .is_cash(true),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build(50.0, date!(2025 - 03 - 10), "too late")
                .transaction_type(TransactionType::Income)
                .is_cash(true),
            &connection,
        )
        .unwrap();

        let result = run(
            &TransactionQuery {
                start_date: Some(date!(2025 - 02 - 01)),
                end_date: Some(date!(2025 - 02 - 28)),
                min_amount: Some(50.0),
                max_amount: Some(100.0),
                is_cash: Some(true),
                transaction_type: Some(TransactionType::Income),
                ..Default::default()
            },
            &connection,
        );
        let by_person = run(
            &TransactionQuery {
                person_id: Some(person.id),
                ..Default::default()
            },
            &connection,
        );

        assert_eq!(names(&result), vec!["match"]);
        assert_eq!(names(&by_person), vec!["match"]);
    }

    #[test]
    fn search_is_case_insensitive_over_name_and_description() {
        let connection = get_test_connection();
        let day = date!(2025 - 01 - 01);
        create_transaction(Transaction::build(1.0, day, "Coffee"), &connection).unwrap();
        create_transaction(
            Transaction::build(2.0, day, "Cafe").description("flat white COFFEE"),
            &connection,
        )
        .unwrap();
        create_transaction(Transaction::build(3.0, day, "Tea"), &connection).unwrap();

        let result = run(
            &TransactionQuery {
                search: Some(" coffee ".to_owned()),
                sort_by: SortBy::Name,
                sort_order: SortOrder::Ascending,
                ..Default::default()
            },
            &connection,
        );

        assert_eq!(names(&result), vec!["Cafe", "Coffee"]);
    }

    #[test]
    fn search_folds_non_ascii_letters() {
        let connection = get_test_connection();
        let day = date!(2025 - 01 - 01);
        create_transaction(Transaction::build(1.0, day, "Äpfel GmbH"), &connection).unwrap();
        create_transaction(
            Transaction::build(2.0, day, "Market").description("ÖL UND ESSIG"),
            &connection,
        )
        .unwrap();
        create_transaction(Transaction::build(3.0, day, "Apfel"), &connection).unwrap();

        let search = |text: &str| {
            run(
                &TransactionQuery {
                    search: Some(text.to_owned()),
                    ..Default::default()
                },
                &connection,
            )
        };

        assert_eq!(names(&search("äpfel")), vec!["Äpfel GmbH"]);
        assert_eq!(names(&search("ÄPFEL")), vec!["Äpfel GmbH"]);
        assert_eq!(names(&search("Äpfel GmbH")), vec!["Äpfel GmbH"]);
        assert_eq!(names(&search("öl und")), vec!["Market"]);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let connection = get_test_connection();
        create_transaction(
            Transaction::build(1.0, date!(2025 - 01 - 01), "only"),
            &connection,
        )
        .unwrap();

        let result = run(
            &TransactionQuery {
                page: Some(u64::MAX),
                page_size: Some(1),
                ..Default::default()
            },
            &connection,
        );

        assert!(result.transactions.is_empty());
        assert_eq!(result.total, 1);
        assert_eq!(result.current_page, u64::MAX);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        let connection = get_test_connection();
        let page = PaginationConfig::default().resolve(None, None);

        let dates = query_transactions(
            &TransactionQuery {
                start_date: Some(date!(2025 - 02 - 01)),
                end_date: Some(date!(2025 - 01 - 01)),
                ..Default::default()
            },
            page,
            &connection,
        );
        let amounts = query_transactions(
            &TransactionQuery {
                min_amount: Some(10.0),
                max_amount: Some(5.0),
                ..Default::default()
            },
            page,
            &connection,
        );

        assert!(matches!(dates, Err(Error::InvalidDateRange(_, _))));
        assert_eq!(amounts, Err(Error::InvalidAmountRange(10.0, 5.0)));
    }
}
