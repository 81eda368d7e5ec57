//! Middleware that checks the logged in user holds the permission a route requires.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    permission::{Permission, user_has_permission},
    user::UserID,
};

/// The state needed for the permission guard of a single route.
#[derive(Debug, Clone)]
pub struct PermissionGuardState {
    /// The permission the guarded route requires.
    pub permission: Permission,
    /// The database connection for looking up the user's roles.
    pub db_connection: Arc<Mutex<Connection>>,
}

/// Middleware function that rejects requests from users lacking the route's permission.
///
/// Must run after [crate::auth::auth_guard], which places the [UserID] in the
/// request extensions. Requests without a user ID get a 401 response and
/// requests from users without the permission get a 403 response.
pub async fn permission_guard(
    State(state): State<PermissionGuardState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(user_id) = request.extensions().get::<UserID>().copied() else {
        tracing::error!(
            "permission guard for {} ran without a user ID, is the auth guard missing?",
            state.permission
        );
        return Error::Unauthorized.into_response();
    };

    match check_permission(&state, user_id) {
        Ok(()) => next.run(request).await,
        Err(error) => error.into_response(),
    }
}

fn check_permission(state: &PermissionGuardState, user_id: UserID) -> Result<(), Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    if user_has_permission(user_id, state.permission, &connection)? {
        Ok(())
    } else {
        tracing::warn!("user {user_id} lacks permission {}", state.permission);
        Err(Error::Forbidden(state.permission))
    }
}

/// Wrap `method_router` so that it only runs for users holding `permission`.
pub fn require(
    permission: Permission,
    method_router: MethodRouter<AppState>,
    state: &AppState,
) -> MethodRouter<AppState> {
    method_router.route_layer(middleware::from_fn_with_state(
        PermissionGuardState {
            permission,
            db_connection: state.db_connection.clone(),
        },
        permission_guard,
    ))
}
