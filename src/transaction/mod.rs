//! Transaction management for the bookkeeping service.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and managing transactions
//! - The query engine, bulk editor and bank statement importer
//! - Route handlers for the transaction endpoints

mod bulk;
mod core;
mod handlers;
mod import;
mod query;
mod range;

pub use bulk::{apply_cost_types_endpoint, bulk_edit_endpoint};
pub use core::{
    Transaction, TransactionData, TransactionType,
    autocomplete_transaction_names, create_transaction, create_transaction_tables,
    delete_transaction, get_all_transactions, get_last_transactions, get_person_transactions,
    get_transaction, get_transactions_in_range, update_transaction,
};
pub use handlers::{
    autocomplete_endpoint, create_transaction_endpoint, delete_transaction_endpoint,
    get_last_transactions_endpoint, get_transaction_endpoint, list_transactions_endpoint,
    query_transactions_endpoint, update_transaction_endpoint,
};
pub use import::import_transactions_endpoint;
pub use query::{QueryResult, TransactionQuery, query_transactions};
pub use range::{DateRange, DateRangeQuery};

#[cfg(test)]
pub(crate) use core::{add_transaction_cost_types, count_transactions};
