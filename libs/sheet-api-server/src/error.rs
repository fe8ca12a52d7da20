use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sheet_api::{ErrorKind, SheetError};

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Encoding => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `SheetError` rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub SheetError);

impl From<SheetError> for ApiError {
    fn from(e: SheetError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        if status.is_server_error() {
            tracing::error!(kind = %self.0.kind(), error = %self.0, "request failed");
        } else {
            tracing::debug!(kind = %self.0.kind(), error = %self.0, "request rejected");
        }
        (status, Json(json!({ "error": self.0.message() }))).into_response()
    }
}
