//! Ends the session by invalidating the auth cookie.

use axum::response::{IntoResponse, Response};
use axum_extra::extract::PrivateCookieJar;

use crate::{ApiResponse, auth::cookie::invalidate_auth_cookie};

/// Invalidate the auth cookie.
///
/// Always succeeds, even if there was no session.
pub async fn log_out_endpoint(jar: PrivateCookieJar) -> Response {
    let jar = invalidate_auth_cookie(jar);

    (jar, ApiResponse::success("logged out")).into_response()
}
