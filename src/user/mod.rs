//! Users of the application and the roles assigned to them.

mod db;
mod domain;
mod handlers;

pub use db::{
    create_user, create_user_tables, delete_user, get_all_users, get_user_by_id,
    get_user_by_username, get_user_profile, get_user_role_names, record_log_in, set_user_roles,
    update_password, update_user, upsert_admin_user,
};
pub use domain::{
    CreateUserData, NewUser, UpdateUserData, User, UserID, UserProfile, UserRolesData, UserUpdate,
    Username,
};
pub use handlers::{
    create_user_endpoint, delete_user_endpoint, get_me_endpoint, get_my_permissions_endpoint,
    get_user_endpoint, list_users_endpoint, set_user_roles_endpoint, update_user_endpoint,
};
