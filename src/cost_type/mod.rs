//! Cost types categorize transactions, e.g. "Rent" or "Wages".

mod db;
mod domain;
mod handlers;

pub use db::{
    create_cost_type, create_cost_type_table, delete_cost_type, get_all_cost_types,
    get_cost_type, update_cost_type,
};
pub use domain::{CostType, CostTypeData, CostTypeName};
pub use handlers::{
    create_cost_type_endpoint, delete_cost_type_endpoint, get_cost_type_endpoint,
    list_cost_types_endpoint, update_cost_type_endpoint,
};
