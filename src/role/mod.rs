//! Roles group permissions so they can be assigned to users.

mod db;
mod domain;
mod handlers;

pub use db::{
    create_role, create_role_tables, delete_role, get_all_roles, get_role, get_role_by_name,
    seed_default_roles, set_role_permissions, update_role,
};
pub use domain::{
    ADMIN_ROLE, Role, RoleData, RoleName, RolePermissionsData, USER_ROLE, USER_ROLE_PERMISSIONS,
};
pub use handlers::{
    create_role_endpoint, delete_role_endpoint, get_role_endpoint, list_roles_endpoint,
    set_role_permissions_endpoint, update_role_endpoint,
};
