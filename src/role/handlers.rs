//! Endpoints for managing roles.

use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, State};
use rusqlite::Connection;

use crate::{
    ApiResponse, AppState, Error,
    database_id::RoleId,
    extract::{Json, Path},
    permission::Permission,
    role::{
        Role, RoleData, RoleName, RolePermissionsData, create_role, delete_role, get_all_roles,
        get_role, set_role_permissions, update_role,
    },
};

/// The state needed by the role endpoints.
#[derive(Debug, Clone)]
pub struct RoleState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RoleState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List all roles with their permissions.
pub async fn list_roles_endpoint(
    State(state): State<RoleState>,
) -> Result<ApiResponse<Vec<Role>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_all_roles(&connection).map(ApiResponse::success)
}

/// Get a single role with its permissions.
pub async fn get_role_endpoint(
    State(state): State<RoleState>,
    Path(role_id): Path<RoleId>,
) -> Result<ApiResponse<Role>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_role(role_id, &connection).map(ApiResponse::success)
}

/// Create a role.
pub async fn create_role_endpoint(
    State(state): State<RoleState>,
    Json(data): Json<RoleData>,
) -> Result<ApiResponse<Role>, Error> {
    let name = RoleName::new(&data.name)?;
    let permissions = Permission::parse_ids(&data.permission_ids)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let tx = connection.unchecked_transaction()?;
    let role = create_role(name, &data.description, &permissions, &tx)?;
    tx.commit()?;

    tracing::info!("Created role \"{}\" with ID {}", role.name, role.id);

    Ok(ApiResponse::created(role))
}

/// Replace a role's name, description and permissions.
pub async fn update_role_endpoint(
    State(state): State<RoleState>,
    Path(role_id): Path<RoleId>,
    Json(data): Json<RoleData>,
) -> Result<ApiResponse<Role>, Error> {
    let name = RoleName::new(&data.name)?;
    let permissions = Permission::parse_ids(&data.permission_ids)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let tx = connection.unchecked_transaction()?;
    let role = update_role(role_id, name, &data.description, &permissions, &tx)?;
    tx.commit()?;

    Ok(ApiResponse::success(role))
}

/// Replace the permissions of a role.
pub async fn set_role_permissions_endpoint(
    State(state): State<RoleState>,
    Json(data): Json<RolePermissionsData>,
) -> Result<ApiResponse<Role>, Error> {
    let permissions = Permission::parse_ids(&data.permission_ids)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let tx = connection.unchecked_transaction()?;
    set_role_permissions(data.role_id, &permissions, &tx)?;
    tx.commit()?;

    get_role(data.role_id, &connection).map(ApiResponse::success)
}

/// Delete a role that is not assigned to any user.
pub async fn delete_role_endpoint(
    State(state): State<RoleState>,
    Path(role_id): Path<RoleId>,
) -> Result<ApiResponse<RoleId>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    delete_role(role_id, &connection)?;
    tracing::info!("Deleted role {role_id}");

    Ok(ApiResponse::success(role_id))
}
