//! Lets a logged in user change their own password.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    ApiResponse, AppState, Error, PasswordHash, ValidatedPassword,
    extract::Json,
    user::{UserID, get_user_by_id, update_password},
};

/// The state needed to change a password.
#[derive(Debug, Clone)]
pub struct ChangePasswordState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ChangePasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Request body for changing the logged in user's password.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChangePasswordData {
    pub current_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

/// Replace the logged in user's password.
///
/// # Errors
///
/// Returns:
/// - [Error::WrongCurrentPassword] if `current_password` does not match,
/// - [Error::PasswordMismatch] if the new password and its confirmation differ,
/// - [Error::TooWeak] if the new password fails the strength check.
pub async fn change_password_endpoint(
    State(state): State<ChangePasswordState>,
    Extension(user_id): Extension<UserID>,
    Json(data): Json<ChangePasswordData>,
) -> Result<ApiResponse<&'static str>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let user = get_user_by_id(user_id, &connection)?;

    if !user.password_hash.verify(&data.current_password)? {
        return Err(Error::WrongCurrentPassword);
    }

    if data.new_password != data.confirm_new_password {
        return Err(Error::PasswordMismatch);
    }

    let password = ValidatedPassword::new(
        &data.new_password,
        &[user.username.as_ref(), &user.email],
    )?;
    let password_hash = PasswordHash::new(password, PasswordHash::DEFAULT_COST)?;
    update_password(user_id, &password_hash, &connection)?;
    tracing::info!("User {user_id} changed their password");

    Ok(ApiResponse::success("password changed"))
}
