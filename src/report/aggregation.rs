//! Transaction aggregation for reports.
//!
//! These functions are pure: they take already loaded transactions and never
//! touch the database.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::transaction::{DateRange, Transaction, TransactionType};

/// The longest daily series that can be requested.
pub const MAX_DAILY_SERIES_DAYS: u16 = 45;

/// The category that expenses without cost types are counted towards.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// Totals over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    /// The sum of all expenses.
    pub total_debts: f64,
    /// The sum of all income.
    pub total_credits: f64,
    /// Credits minus debts.
    pub financial_balance: f64,
}

/// The income and expenses of a single day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub date: Date,
    /// The day of the month.
    pub day: u8,
    pub income: f64,
    pub expenses: f64,
    /// Income minus expenses for the day.
    pub balance: f64,
}

/// Total expenses of one cost type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryExpense {
    /// A lowercase key for the category.
    pub category: String,
    /// The cost type name for display.
    pub label: String,
    pub amount: f64,
}

/// Sum the income and expenses of `transactions`.
pub fn financial_summary(transactions: &[Transaction]) -> FinancialSummary {
    let (total_credits, total_debts) =
        transactions
            .iter()
            .fold((0.0, 0.0), |(credits, debts), transaction| {
                match transaction.transaction_type {
                    TransactionType::Income => (credits + transaction.amount, debts),
                    TransactionType::Expense => (credits, debts + transaction.amount),
                }
            });

    FinancialSummary {
        total_debts,
        total_credits,
        financial_balance: total_credits - total_debts,
    }
}

/// Build one entry per day of `range`, oldest first.
///
/// The range is shortened to the last [MAX_DAILY_SERIES_DAYS] days ending at
/// its end. Days without transactions have zero totals and transactions
/// outside the range are ignored.
pub fn daily_series(transactions: &[Transaction], range: DateRange) -> Vec<DailyEntry> {
    let earliest_start = range
        .end()
        .saturating_sub(Duration::days(i64::from(MAX_DAILY_SERIES_DAYS) - 1));
    let start = range.start().max(earliest_start);

    let mut totals: HashMap<Date, (f64, f64)> = HashMap::new();
    for transaction in transactions
        .iter()
        .filter(|transaction| start <= transaction.date && transaction.date <= range.end())
    {
        let (income, expenses) = totals.entry(transaction.date).or_insert((0.0, 0.0));
        match transaction.transaction_type {
            TransactionType::Income => *income += transaction.amount,
            TransactionType::Expense => *expenses += transaction.amount,
        }
    }

    let mut series = Vec::new();
    let mut date = start;
    loop {
        let (income, expenses) = totals.get(&date).copied().unwrap_or_default();
        series.push(DailyEntry {
            date,
            day: date.day(),
            income,
            expenses,
            balance: income - expenses,
        });

        match date.next_day() {
            Some(next) if next <= range.end() => date = next,
            _ => break,
        }
    }

    series
}

/// Total the expenses of `transactions` per cost type, largest first.
///
/// An expense with several cost types counts fully towards each of them.
/// Expenses without cost types are counted as [UNCATEGORIZED_LABEL].
/// Income is ignored.
pub fn expenses_by_category(transactions: &[Transaction]) -> Vec<CategoryExpense> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for transaction in transactions
        .iter()
        .filter(|transaction| transaction.transaction_type == TransactionType::Expense)
    {
        if transaction.cost_types.is_empty() {
            *totals.entry(UNCATEGORIZED_LABEL).or_insert(0.0) += transaction.amount;
        }

        for cost_type in &transaction.cost_types {
            *totals.entry(cost_type.name.as_ref()).or_insert(0.0) += transaction.amount;
        }
    }

    let mut categories: Vec<CategoryExpense> = totals
        .into_iter()
        .map(|(label, amount)| CategoryExpense {
            category: label.to_lowercase(),
            label: label.to_owned(),
            amount,
        })
        .collect();

    categories.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.label.cmp(&b.label))
    });

    categories
}

#[cfg(test)]
mod tests {
    use time::{Date, OffsetDateTime, macros::date};

    use crate::{
        cost_type::{CostType, CostTypeName},
        transaction::{DateRange, Transaction, TransactionType},
    };

    use super::{
        MAX_DAILY_SERIES_DAYS, UNCATEGORIZED_LABEL, daily_series, expenses_by_category,
        financial_summary,
    };

    fn transaction(
        amount: f64,
        date: time::Date,
        transaction_type: TransactionType,
        cost_types: &[&str],
    ) -> Transaction {
        Transaction {
            id: 0,
            name: "test".to_owned(),
            description: String::new(),
            amount,
            is_cash: false,
            transaction_type,
            date,
            submit_date: OffsetDateTime::UNIX_EPOCH,
            update_date: None,
            person_id: None,
            cost_types: cost_types
                .iter()
                .enumerate()
                .map(|(id, name)| CostType {
                    id: id as i64 + 1,
                    name: CostTypeName::new_unchecked(name),
                })
                .collect(),
            import_id: None,
        }
    }

    #[test]
    fn summary_of_no_transactions_is_zero() {
        let summary = financial_summary(&[]);

        assert_eq!(summary.total_credits, 0.0);
        assert_eq!(summary.total_debts, 0.0);
        assert_eq!(summary.financial_balance, 0.0);
    }

    #[test]
    fn summary_subtracts_debts_from_credits() {
        let day = date!(2025 - 10 - 01);
        let transactions = [
            transaction(100.0, day, TransactionType::Income, &[]),
            transaction(50.0, day, TransactionType::Income, &[]),
            transaction(30.0, day, TransactionType::Expense, &[]),
        ];

        let summary = financial_summary(&transactions);

        assert_eq!(summary.total_credits, 150.0);
        assert_eq!(summary.total_debts, 30.0);
        assert_eq!(summary.financial_balance, 120.0);
    }

    #[test]
    fn daily_series_fills_empty_days() {
        let transactions = [
            transaction(100.0, date!(2025 - 10 - 01), TransactionType::Income, &[]),
            transaction(40.0, date!(2025 - 10 - 03), TransactionType::Expense, &[]),
            transaction(999.0, date!(2025 - 10 - 09), TransactionType::Income, &[]),
        ];
        let range = DateRange::new(date!(2025 - 10 - 01), date!(2025 - 10 - 03)).unwrap();

        let series = daily_series(&transactions, range);

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].income, 100.0);
        assert_eq!(series[0].balance, 100.0);
        assert_eq!(series[1].date, date!(2025 - 10 - 02));
        assert_eq!(series[1].day, 2);
        assert_eq!(series[1].balance, 0.0);
        assert_eq!(series[2].expenses, 40.0);
        assert_eq!(series[2].balance, -40.0);
    }

    #[test]
    fn daily_series_is_clamped_to_max_days() {
        let range = DateRange::new(date!(2025 - 01 - 01), date!(2025 - 12 - 31)).unwrap();

        let series = daily_series(&[], range);

        assert_eq!(series.len(), MAX_DAILY_SERIES_DAYS as usize);
        assert_eq!(series.last().map(|entry| entry.date), Some(date!(2025 - 12 - 31)));
        assert_eq!(series[0].date, date!(2025 - 11 - 17));
    }

    #[test]
    fn daily_series_at_earliest_date() {
        let range = DateRange::new(Date::MIN, Date::MIN).unwrap();

        let series = daily_series(&[], range);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, Date::MIN);
    }

    #[test]
    fn expenses_count_towards_every_cost_type() {
        let day = date!(2025 - 10 - 01);
        let transactions = [
            transaction(30.0, day, TransactionType::Expense, &["Fuel", "Travel"]),
            transaction(20.0, day, TransactionType::Expense, &["Travel"]),
            transaction(5.0, day, TransactionType::Expense, &[]),
            transaction(500.0, day, TransactionType::Income, &["Travel"]),
        ];

        let categories = expenses_by_category(&transactions);

        let summary: Vec<(&str, f64)> = categories
            .iter()
            .map(|category| (category.label.as_str(), category.amount))
            .collect();
        assert_eq!(
            summary,
            vec![("Travel", 50.0), ("Fuel", 30.0), (UNCATEGORIZED_LABEL, 5.0)]
        );
        assert_eq!(categories[0].category, "travel");
    }

    #[test]
    fn equal_expenses_are_sorted_by_name() {
        let day = date!(2025 - 10 - 01);
        let transactions = [
            transaction(10.0, day, TransactionType::Expense, &["Rent"]),
            transaction(10.0, day, TransactionType::Expense, &["Power"]),
        ];

        let labels: Vec<String> = expenses_by_category(&transactions)
            .into_iter()
            .map(|category| category.label)
            .collect();

        assert_eq!(labels, vec!["Power", "Rent"]);
    }
}
