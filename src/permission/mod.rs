//! Permissions, and the middleware that enforces them per route.

mod db;
mod domain;
mod guard;
mod list;

pub use db::{create_permission_table, get_user_permissions, user_has_permission};
pub use domain::{Permission, PermissionInfo};
pub use guard::require;
pub use list::{get_permission_endpoint, list_permissions_endpoint};
