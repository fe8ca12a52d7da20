use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use sheet_api::SheetError;
use sheet_engine::ReadOutput;

use super::AppState;
use crate::error::ApiError;

const TSV_CONTENT_TYPE: &str = "text/tab-separated-values";

// ═══════════════════════════════════════════════════════════════
//  GET /
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.info())
}

// ═══════════════════════════════════════════════════════════════
//  GET /{dataset}?col=value&format=tsv&filename=x
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_read(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    match state.gateway.read(&dataset, &params).await? {
        ReadOutput::Json(records) => Ok(Json(records).into_response()),
        ReadOutput::Tsv { filename, body } => {
            let disposition = HeaderValue::from_str(&format!("attachment; filename={filename}"))
                .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
            Ok((
                StatusCode::OK,
                [
                    (CONTENT_TYPE, HeaderValue::from_static(TSV_CONTENT_TYPE)),
                    (CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  POST /post, POST /update
// ═══════════════════════════════════════════════════════════════

/// Authorize, then parse the body. An unauthorized caller never gets
/// body-parse feedback.
fn write_request(state: &AppState, headers: &HeaderMap, body: &Bytes) -> Result<serde_json::Value, ApiError> {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    state.gateway.authorize(authorization)?;

    serde_json::from_slice(body)
        .map_err(|e| ApiError(SheetError::input(format!("invalid JSON body: {e}"))))
}

pub(crate) async fn handle_insert(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = write_request(&state, &headers, &body)?;
    Ok(Json(state.gateway.insert(&body).await?))
}

pub(crate) async fn handle_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body = write_request(&state, &headers, &body)?;
    let report = state.gateway.update(&body).await?;
    Ok(Json(report).into_response())
}
