//! Persons are the counterparties of transactions, e.g. customers and suppliers.

mod db;
mod domain;
mod handlers;

pub use db::{
    create_person, create_person_table, delete_person, get_all_persons, get_person,
    get_person_by_account_number, update_person,
};
pub use domain::{Person, PersonData, PersonDetails, PersonName};
pub use handlers::{
    create_person_endpoint, delete_person_endpoint, get_person_balance_endpoint,
    get_person_endpoint, get_person_transactions_endpoint, list_persons_endpoint,
    update_person_endpoint,
};
