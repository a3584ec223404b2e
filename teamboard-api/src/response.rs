/// Success envelope
///
/// Every successful handler answers with
///
/// ```json
/// { "success": true, "data": { ... }, "message": "optional" }
/// ```
///
/// `data` is omitted for message-only responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    data: Option<T>,
    message: Option<String>,
    status: StatusCode,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with a payload
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            message: None,
            status: StatusCode::OK,
        }
    }

    /// 201 with the created resource
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::success(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// 200 carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: Some(message.into()),
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            success: true,
            data: self.data.as_ref(),
            message: self.message.as_deref(),
        };

        (self.status, Json(envelope)).into_response()
    }
}
