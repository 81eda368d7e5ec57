//! Self-service registration of new users.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    ApiResponse, Error, PasswordHash, ValidatedPassword,
    auth::{cookie::set_auth_cookie, log_in::{LogInState, get_session_data}},
    extract::Json,
    user::{NewUser, Username, create_user},
};

/// The details sent in a registration request.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterData {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Create a user with no roles and log them in.
///
/// New users can do nothing but view their own profile until an
/// administrator gives them a role.
pub async fn register_endpoint(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Json(data): Json<RegisterData>,
) -> Result<Response, Error> {
    let username = Username::new(&data.username)?;
    let password = ValidatedPassword::new(&data.password, &[username.as_ref(), &data.email])?;
    let password_hash = PasswordHash::new(password, PasswordHash::DEFAULT_COST)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let user = create_user(
        NewUser {
            username,
            first_name: data.first_name,
            last_name: data.last_name,
            email: data.email,
            password_hash,
        },
        &connection,
    )?;
    let session = get_session_data(user.id, &connection)?;
    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)?;
    tracing::info!("Registered user \"{}\" with ID {}", user.username, user.id);

    Ok((jar, ApiResponse::created(session)).into_response())
}
