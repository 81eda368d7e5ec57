//! The JSON envelope shared by every API response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// The body of every API response.
///
/// Successful responses carry the payload in `data`. Error responses set
/// `success` to false, use an application error code in `code` and put the
/// error message in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// The HTTP status code for successful responses, or the application
    /// error code for errors.
    pub code: u16,
    /// A message that can be shown to the user.
    pub message: String,
    /// A message meant for the developers of API clients.
    pub developer_message: String,
    /// The response payload.
    pub data: Option<T>,
    #[serde(skip)]
    status: StatusCode,
}

/// The payload of an error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    /// The error message.
    pub error: String,
}

impl<T> ApiResponse<T> {
    /// A `200 OK` response carrying `data`.
    pub fn success(data: T) -> Self {
        Self::with_status(StatusCode::OK, data)
    }

    /// A `201 Created` response carrying `data`.
    pub fn created(data: T) -> Self {
        Self::with_status(StatusCode::CREATED, data)
    }

    fn with_status(status: StatusCode, data: T) -> Self {
        Self {
            success: true,
            code: status.as_u16(),
            message: "Success".to_owned(),
            developer_message: "Success".to_owned(),
            data: Some(data),
            status,
        }
    }
}

impl ApiResponse<ErrorData> {
    /// An error response with the application error `code`.
    ///
    /// The HTTP status is set by the caller, see [crate::Error::status].
    pub fn error(code: u16, message: &str, developer_message: &str) -> Self {
        Self {
            success: false,
            code,
            message: message.to_owned(),
            developer_message: developer_message.to_owned(),
            data: Some(ErrorData {
                error: message.to_owned(),
            }),
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
