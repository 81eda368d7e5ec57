//! Endpoints for managing users.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
};
use rusqlite::Connection;

use crate::{
    ApiResponse, AppState, Error, PasswordHash, ValidatedPassword,
    extract::{Json, Path},
    permission::get_user_permissions,
    user::{
        CreateUserData, NewUser, UpdateUserData, UserID, UserProfile, UserRolesData, Username,
        create_user, delete_user, get_all_users, get_user_profile, get_user_role_names,
        set_user_roles, update_user,
    },
};

/// The state needed by the user endpoints.
#[derive(Debug, Clone)]
pub struct UserState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List all users with their role names.
pub async fn list_users_endpoint(
    State(state): State<UserState>,
) -> Result<ApiResponse<Vec<UserProfile>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let profiles = get_all_users(&connection)?
        .into_iter()
        .map(|user| {
            let roles = get_user_role_names(user.id, &connection)?;
            Ok(UserProfile::new(user, roles))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(ApiResponse::success(profiles))
}

/// Get a single user with their role names.
pub async fn get_user_endpoint(
    State(state): State<UserState>,
    Path(user_id): Path<i64>,
) -> Result<ApiResponse<UserProfile>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_user_profile(UserID::new(user_id), &connection).map(ApiResponse::success)
}

/// Create a user with a set of roles.
///
/// The password must pass the strength check, see [ValidatedPassword::new].
pub async fn create_user_endpoint(
    State(state): State<UserState>,
    Json(data): Json<CreateUserData>,
) -> Result<ApiResponse<UserProfile>, Error> {
    let username = Username::new(&data.username)?;
    let password = ValidatedPassword::new(&data.password, &[username.as_ref(), &data.email])?;
    let password_hash = PasswordHash::new(password, PasswordHash::DEFAULT_COST)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let tx = connection.unchecked_transaction()?;
    let user = create_user(
        NewUser {
            username,
            first_name: data.first_name,
            last_name: data.last_name,
            email: data.email,
            password_hash,
        },
        &tx,
    )?;
    set_user_roles(user.id, &data.role_ids, &tx)?;
    let profile = get_user_profile(user.id, &tx)?;
    tx.commit()?;

    tracing::info!("Created user \"{}\" with ID {}", profile.username, profile.id);

    Ok(ApiResponse::created(profile))
}

/// Change a user's details, and optionally their roles.
pub async fn update_user_endpoint(
    State(state): State<UserState>,
    Path(user_id): Path<i64>,
    Json(data): Json<UpdateUserData>,
) -> Result<ApiResponse<UserProfile>, Error> {
    let user_id = UserID::new(user_id);
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let tx = connection.unchecked_transaction()?;
    update_user(user_id, &data.update, &tx)?;
    if let Some(role_ids) = &data.role_ids {
        set_user_roles(user_id, role_ids, &tx)?;
    }
    let profile = get_user_profile(user_id, &tx)?;
    tx.commit()?;

    Ok(ApiResponse::success(profile))
}

/// Replace the roles of a user.
pub async fn set_user_roles_endpoint(
    State(state): State<UserState>,
    Json(data): Json<UserRolesData>,
) -> Result<ApiResponse<UserProfile>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let tx = connection.unchecked_transaction()?;
    set_user_roles(data.user_id, &data.role_ids, &tx)?;
    let profile = get_user_profile(data.user_id, &tx)?;
    tx.commit()?;

    Ok(ApiResponse::success(profile))
}

/// Delete a user and their role assignments.
pub async fn delete_user_endpoint(
    State(state): State<UserState>,
    Path(user_id): Path<i64>,
) -> Result<ApiResponse<UserID>, Error> {
    let user_id = UserID::new(user_id);
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let tx = connection.unchecked_transaction()?;
    delete_user(user_id, &tx)?;
    tx.commit()?;
    tracing::info!("Deleted user {user_id}");

    Ok(ApiResponse::success(user_id))
}

/// Get the logged in user.
pub async fn get_me_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserID>,
) -> Result<ApiResponse<UserProfile>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_user_profile(user_id, &connection).map(ApiResponse::success)
}

/// Get the names of the logged in user's effective permissions.
pub async fn get_my_permissions_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserID>,
) -> Result<ApiResponse<Vec<String>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let names = get_user_permissions(user_id, &connection)?
        .into_iter()
        .map(|permission| permission.name().to_owned())
        .collect();

    Ok(ApiResponse::success(names))
}
