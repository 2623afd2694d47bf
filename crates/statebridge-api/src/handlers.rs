//! REST API handlers.
//!
//! Each handler makes at most one store call and maps the outcome to a
//! status code. Store failures are logged with the key and cause; clients
//! only ever see a fixed message.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use statebridge_store::{Metadata, SaveOptions};
use tracing::{debug, error};

use crate::ApiState;

const MISSING_KEY: &str = "missing key";
const READ_BODY_FAILED: &str = "read body failed";
const NOT_FOUND: &str = "not found";
const INTERNAL_ERROR: &str = "internal error";

fn error_response(status: StatusCode, msg: &'static str) -> Response {
    (status, msg).into_response()
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET|POST|DELETE /state/ (empty key segment)
pub async fn missing_key() -> Response {
    error_response(StatusCode::BAD_REQUEST, MISSING_KEY)
}

/// GET /state/{key}
pub async fn get_state(State(state): State<ApiState>, Path(key): Path<String>) -> Response {
    if key.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, MISSING_KEY);
    }

    match state.store.get(&state.store_name, &key, &Metadata::new()).await {
        Ok(item) => match item.value {
            Some(value) if !value.is_empty() => {
                let content_type = HeaderValue::from_static("application/octet-stream");
                ([(header::CONTENT_TYPE, content_type)], value).into_response()
            }
            _ => error_response(StatusCode::NOT_FOUND, NOT_FOUND),
        },
        Err(e) => {
            error!(
                %key,
                store = %state.store_name,
                backend = state.store.backend(),
                error = %e,
                "get state failed"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}

/// POST /state/{key}
pub async fn save_state(
    State(state): State<ApiState>,
    Path(key): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if key.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, MISSING_KEY);
    }

    let data = match body {
        Ok(data) => data,
        Err(rejection) => {
            debug!(%key, reason = %rejection.body_text(), "request body unreadable");
            return error_response(StatusCode::BAD_REQUEST, READ_BODY_FAILED);
        }
    };

    match state
        .store
        .save(&state.store_name, &key, data, &Metadata::new(), &SaveOptions::default())
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!(
                %key,
                store = %state.store_name,
                backend = state.store.backend(),
                error = %e,
                "save state failed"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}

/// DELETE /state/{key}
pub async fn delete_state(State(state): State<ApiState>, Path(key): Path<String>) -> Response {
    if key.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, MISSING_KEY);
    }

    match state.store.delete(&state.store_name, &key, &Metadata::new()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!(
                %key,
                store = %state.store_name,
                backend = state.store.backend(),
                error = %e,
                "delete state failed"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}
