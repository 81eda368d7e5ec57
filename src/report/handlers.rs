//! Endpoints that serve report data.

use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, State};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::{
    ApiResponse, AppState, Error,
    extract::Query,
    report::{
        CategoryExpense, DailyEntry, FinancialSummary, MAX_DAILY_SERIES_DAYS, daily_series,
        expenses_by_category, financial_summary,
    },
    timezone::local_today,
    transaction::{DateRange, DateRangeQuery, Transaction, get_transactions_in_range},
};

/// How many days back reports look when no start date is given.
const DEFAULT_REPORT_DAYS: i64 = 7;

/// How many days the daily series covers when `days` is not given.
const DEFAULT_DAILY_SERIES_DAYS: u16 = 7;

/// The state needed by the report endpoints.
#[derive(Debug, Clone)]
pub struct ReportState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Every report over one date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub start_date: Date,
    pub end_date: Date,
    pub financial_summary: FinancialSummary,
    pub daily_series: Vec<DailyEntry>,
    pub expenses_by_category: Vec<CategoryExpense>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DailySeriesQuery {
    pub days: Option<u16>,
}

pub async fn get_report_summary_endpoint(
    State(state): State<ReportState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<ApiResponse<ReportSummary>, Error> {
    let range = resolve_range(&query, &state.local_timezone)?;
    let transactions = load_transactions(&state, range)?;

    Ok(ApiResponse::success(ReportSummary {
        start_date: range.start(),
        end_date: range.end(),
        financial_summary: financial_summary(&transactions),
        daily_series: daily_series(&transactions, range),
        expenses_by_category: expenses_by_category(&transactions),
    }))
}

pub async fn get_financial_summary_endpoint(
    State(state): State<ReportState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<ApiResponse<FinancialSummary>, Error> {
    let range = resolve_range(&query, &state.local_timezone)?;
    let transactions = load_transactions(&state, range)?;

    Ok(ApiResponse::success(financial_summary(&transactions)))
}

/// The per-day series for the last `days` days, today included.
///
/// `days` defaults to 7 and is clamped to between 1 and [MAX_DAILY_SERIES_DAYS].
pub async fn get_daily_series_endpoint(
    State(state): State<ReportState>,
    Query(query): Query<DailySeriesQuery>,
) -> Result<ApiResponse<Vec<DailyEntry>>, Error> {
    let days = query
        .days
        .unwrap_or(DEFAULT_DAILY_SERIES_DAYS)
        .clamp(1, MAX_DAILY_SERIES_DAYS);
    let range = DateRange::ending_on(today(&state.local_timezone)?, days);
    let transactions = load_transactions(&state, range)?;

    Ok(ApiResponse::success(daily_series(&transactions, range)))
}

pub async fn get_expenses_by_category_endpoint(
    State(state): State<ReportState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<ApiResponse<Vec<CategoryExpense>>, Error> {
    let range = resolve_range(&query, &state.local_timezone)?;
    let transactions = load_transactions(&state, range)?;

    Ok(ApiResponse::success(expenses_by_category(&transactions)))
}

fn today(local_timezone: &str) -> Result<Date, Error> {
    local_today(local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {local_timezone}");
        Error::InvalidTimezoneError(local_timezone.to_owned())
    })
}

/// The requested range, defaulting to the last week ending today.
fn resolve_range(query: &DateRangeQuery, local_timezone: &str) -> Result<DateRange, Error> {
    query.validate()?;

    let today = today(local_timezone)?;
    let default = DateRange::new(
        today.saturating_sub(Duration::days(DEFAULT_REPORT_DAYS)),
        today,
    )?;

    query.resolve(default)
}

fn load_transactions(state: &ReportState, range: DateRange) -> Result<Vec<Transaction>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_transactions_in_range(range.start(), range.end(), &connection)
}
