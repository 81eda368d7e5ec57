//! Bookkeeper is a web service for keeping the books of a small business.
//!
//! This library provides a JSON REST API for recording income and expense
//! transactions, managing counterparties ("persons") and cost types, querying
//! and bulk-editing transactions, and producing report data. Every endpoint is
//! guarded by a role and permission model.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use time::Date;
use tokio::signal;

mod api_response;
mod app_state;
mod auth;
mod cost_type;
mod database_id;
mod db;
mod endpoints;
mod extract;
mod logging;
mod pagination;
mod permission;
mod person;
mod report;
mod role;
mod routing;
mod timezone;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use api_response::{ApiResponse, ErrorData};
pub use app_state::AppState;
pub use auth::{PasswordHash, ValidatedPassword};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::PaginationConfig;
pub use permission::Permission;
pub use routing::build_router;
pub use timezone::get_local_offset;
pub use user::{UserID, upsert_admin_user};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
///
/// Each error maps to an HTTP status code and a numeric application error
/// code, see [Error::code] and [Error::status].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The transaction ID does not refer to a stored transaction.
    #[error("the transaction could not be found")]
    TransactionNotFound,

    /// Transaction amounts must be finite and greater than zero.
    ///
    /// Whether money came in or went out is recorded by the transaction type,
    /// not the sign of the amount.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    InvalidAmount(f64),

    /// An empty string was used as a transaction name.
    #[error("transaction name cannot be empty")]
    EmptyTransactionName,

    /// A bulk edit was requested without selecting any transactions.
    #[error("no transactions were selected")]
    EmptyBulkSelection,

    /// A bulk cost type change was requested with an empty set of cost types.
    #[error("at least one cost type must be selected")]
    EmptyCostTypeSelection,

    /// The specified import ID already exists in the database.
    ///
    /// When importing transactions from a CSV file, an import ID is used to
    /// uniquely identify each transaction. Rejecting duplicate import IDs
    /// avoids importing the same transaction multiple times, which is likely
    /// to happen if the user tries to import CSV files that overlap in time.
    #[error("the import ID already exists in the database")]
    DuplicateImportId,

    /// The person ID does not refer to a stored person.
    #[error("the person could not be found")]
    PersonNotFound,

    /// A person cannot be deleted while transactions refer to them.
    #[error("the person has transactions and cannot be deleted")]
    PersonHasTransactions,

    /// An empty string was used as a person's name.
    #[error("person name cannot be empty")]
    EmptyPersonName,

    /// The cost type ID does not refer to a stored cost type.
    #[error("the cost type could not be found")]
    CostTypeNotFound,

    /// A cost type cannot be deleted while transactions refer to it.
    #[error("the cost type is used by transactions and cannot be deleted")]
    CostTypeHasTransactions,

    /// An empty string was used to create a cost type name.
    #[error("cost type name cannot be empty")]
    EmptyCostTypeName,

    /// The cost type name is already used by another cost type.
    #[error("the cost type \"{0}\" already exists")]
    DuplicateCostTypeName(String),

    /// The start of a date range came after its end.
    #[error("the start date {0} is after the end date {1}")]
    InvalidDateRange(Date, Date),

    /// The minimum of an amount range was greater than its maximum.
    #[error("the minimum amount {0} is greater than the maximum amount {1}")]
    InvalidAmountRange(f64, f64),

    /// The multipart form could not be parsed as a list of CSV files.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a CSV file.
    #[error("file is not a CSV")]
    NotCSV,

    /// The CSV had issues that prevented it from being parsed.
    #[error("could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// The user provided an invalid combination of username and password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// An empty string was used as a username.
    #[error("username cannot be empty")]
    EmptyUsername,

    /// The username is already used by another user.
    #[error("the username \"{0}\" is already taken")]
    UsernameTaken(String),

    /// The email address is already used by another user.
    #[error("the email \"{0}\" is already taken")]
    EmailTaken(String),

    /// Banned users may not log in.
    #[error("the user is banned")]
    UserBanned,

    /// Deactivated users may not log in.
    #[error("the user is inactive")]
    UserInactive,

    /// The current password given when changing password was wrong.
    #[error("the current password is incorrect")]
    WrongCurrentPassword,

    /// The new password and its confirmation do not match.
    #[error("the new password and confirmation do not match")]
    PasswordMismatch,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The request did not carry a readable session cookie.
    #[error("not logged in")]
    Unauthorized,

    /// The session cookie has expired.
    #[error("the session has expired")]
    SessionExpired,

    /// The logged in user lacks the permission required by the route.
    #[error("missing permission {0}")]
    Forbidden(Permission),

    /// The user ID does not refer to a stored user.
    #[error("the user could not be found")]
    UserNotFound,

    /// The role ID does not refer to a stored role.
    #[error("the role could not be found")]
    RoleNotFound,

    /// The role name is already used by another role.
    #[error("the role \"{0}\" already exists")]
    DuplicateRoleName(String),

    /// A role cannot be deleted while it is assigned to users.
    #[error("the role is assigned to users and cannot be deleted")]
    RoleInUse,

    /// An empty string was used as a role name.
    #[error("role name cannot be empty")]
    EmptyRoleName,

    /// The permission ID does not match any permission.
    #[error("no permission has the ID {0}")]
    PermissionNotFound(i64),

    /// The request body, path or query string could not be parsed.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("transaction.import_id") =>
            {
                Error::DuplicateImportId
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The message shown to clients for errors that are only meant for the server logs.
const INTERNAL_ERROR_MESSAGE: &str =
    "An unexpected error occurred, check the server logs for more details.";

impl Error {
    /// The application error code reported in the `code` field of an error response.
    pub fn code(&self) -> u16 {
        match self {
            Error::TransactionNotFound => 4001,
            Error::InvalidAmount(_) => 4002,
            Error::EmptyTransactionName => 4003,
            Error::EmptyBulkSelection | Error::EmptyCostTypeSelection => 4004,
            Error::DuplicateImportId => 4005,
            Error::PersonNotFound => 4101,
            Error::PersonHasTransactions => 4102,
            Error::EmptyPersonName => 4103,
            Error::CostTypeNotFound => 4201,
            Error::CostTypeHasTransactions => 4202,
            Error::EmptyCostTypeName => 4203,
            Error::DuplicateCostTypeName(_) => 4204,
            Error::InvalidDateRange(_, _) => 4301,
            Error::InvalidAmountRange(_, _) => 4302,
            Error::MultipartError(_) | Error::NotCSV | Error::InvalidCSV(_) => 4303,
            Error::InvalidCredentials => 4401,
            Error::UsernameTaken(_) => 4402,
            Error::EmailTaken(_) => 4403,
            Error::UserBanned => 4404,
            Error::UserInactive => 4405,
            Error::WrongCurrentPassword => 4406,
            Error::PasswordMismatch => 4407,
            Error::TooWeak(_) => 4408,
            Error::EmptyUsername => 4409,
            Error::Unauthorized => 4501,
            Error::SessionExpired => 4502,
            Error::Forbidden(_) => 4503,
            Error::UserNotFound => 4601,
            Error::RoleNotFound => 4701,
            Error::DuplicateRoleName(_) => 4702,
            Error::RoleInUse => 4703,
            Error::EmptyRoleName => 4704,
            Error::PermissionNotFound(_) => 4801,
            Error::MalformedRequest(_) => 400,
            Error::NotFound => 404,
            Error::HashingError(_)
            | Error::SqlError(_)
            | Error::InvalidTimezoneError(_)
            | Error::JSONSerializationError(_)
            | Error::DatabaseLockError => 500,
        }
    }

    /// The HTTP status code of the response for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::TransactionNotFound
            | Error::PersonNotFound
            | Error::CostTypeNotFound
            | Error::UserNotFound
            | Error::RoleNotFound
            | Error::PermissionNotFound(_)
            | Error::NotFound => StatusCode::NOT_FOUND,
            Error::DuplicateImportId
            | Error::PersonHasTransactions
            | Error::CostTypeHasTransactions
            | Error::DuplicateCostTypeName(_)
            | Error::UsernameTaken(_)
            | Error::EmailTaken(_)
            | Error::DuplicateRoleName(_)
            | Error::RoleInUse => StatusCode::CONFLICT,
            Error::InvalidCredentials | Error::Unauthorized | Error::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }
            Error::UserBanned | Error::UserInactive | Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::HashingError(_)
            | Error::SqlError(_)
            | Error::InvalidTimezoneError(_)
            | Error::JSONSerializationError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether the error details must stay in the server logs.
    fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = if self.is_internal() {
            tracing::error!("An unexpected error occurred: {}", self);
            ApiResponse::error(code, INTERNAL_ERROR_MESSAGE, "internal server error")
        } else {
            let message = self.to_string();
            ApiResponse::error(code, &message, &format!("{self:?}"))
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{Error, Permission, test_utils::parse_error_body};

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[tokio::test]
    async fn client_errors_include_message() {
        let response = Error::PersonHasTransactions.into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = parse_error_body(response).await;
        assert!(!body.success);
        assert_eq!(body.code, 4102);
        assert_eq!(
            body.data.unwrap().error,
            "the person has transactions and cannot be deleted"
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = Error::HashingError("secret detail".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = parse_error_body(response).await;
        assert_eq!(body.code, 500);
        assert!(!body.message.contains("secret detail"));
        assert!(!body.developer_message.contains("secret detail"));
    }

    #[test]
    fn forbidden_names_permission() {
        let error = Error::Forbidden(Permission::DeletePerson);

        assert_eq!(error.to_string(), "missing permission DeletePerson");
        assert_eq!(error.status(), StatusCode::FORBIDDEN);
        assert_eq!(error.code(), 4503);
    }
}
