//! Report data computed from transactions: totals, a per-day series and
//! expenses grouped by cost type.

mod aggregation;
mod handlers;

pub use aggregation::{
    CategoryExpense, DailyEntry, FinancialSummary, MAX_DAILY_SERIES_DAYS, daily_series,
    expenses_by_category, financial_summary,
};
pub use handlers::{
    get_daily_series_endpoint, get_expenses_by_category_endpoint, get_financial_summary_endpoint,
    get_report_summary_endpoint,
};
