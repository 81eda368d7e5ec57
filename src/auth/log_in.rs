//! Handles log-in requests.
//! The cookie module handles the lower level session cookie logic.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    ApiResponse, AppState, Error,
    auth::cookie::set_auth_cookie,
    extract::Json,
    permission::get_user_permissions,
    user::{User, UserID, UserProfile, get_user_by_username, get_user_profile, record_log_in},
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
pub(crate) const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The credentials sent in a log-in request.
///
/// The password is not validated here since it is only compared against the stored hash.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    pub username: String,
    pub password: String,
    /// Whether to extend the initial session to one week.
    #[serde(default)]
    pub remember_me: bool,
}

/// The logged in user and the names of their effective permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub user: UserProfile,
    pub permissions: Vec<String>,
}

/// Build the session data returned after logging in or registering.
pub(crate) fn get_session_data(
    user_id: UserID,
    connection: &Connection,
) -> Result<SessionData, Error> {
    let user = get_user_profile(user_id, connection)?;
    let permissions = get_user_permissions(user_id, connection)?
        .into_iter()
        .map(|permission| permission.name().to_owned())
        .collect();

    Ok(SessionData { user, permissions })
}

/// Look up the user trying to log in.
///
/// The database lock is released before returning so the password can be
/// checked without blocking other requests.
fn find_log_in_user(state: &LogInState, username: &str) -> Result<User, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    match get_user_by_username(username.trim(), &connection) {
        Ok(user) => Ok(user),
        Err(Error::UserNotFound) => {
            tracing::info!("Log-in attempt for unknown user \"{username}\"");
            Err(Error::InvalidCredentials)
        }
        Err(error) => Err(error),
    }
}

/// Check the user's credentials and start a session.
///
/// Unknown usernames and wrong passwords are both reported as
/// [Error::InvalidCredentials]. Banned and inactive users are refused even
/// with the right password.
pub async fn log_in_endpoint(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Json(data): Json<LogInData>,
) -> Result<Response, Error> {
    let user = find_log_in_user(&state, &data.username)?;

    if !user.password_hash.verify(&data.password)? {
        tracing::info!("Wrong password for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    user.ensure_can_log_in()?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    record_log_in(user.id, OffsetDateTime::now_utc(), &connection)?;
    let session = get_session_data(user.id, &connection)?;

    let cookie_duration = if data.remember_me {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };
    let jar = set_auth_cookie(jar, user.id, cookie_duration)?;
    tracing::info!("User {} logged in", user.id);

    Ok((jar, ApiResponse::success(session)).into_response())
}
