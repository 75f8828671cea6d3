//! Development-mode error detail.
//!
//! Server errors answer with a generic message. When the service runs with
//! `APP_ENV=development` this middleware copies the internal error text
//! (carried as an `ErrorDetail` response extension) into the JSON body as
//! `"detail"`.

use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    app::AppState,
    error::{ErrorDetail, GENERIC_SERVER_ERROR},
};

pub async fn error_details_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if !state.expose_error_details {
        return response;
    }

    match response.extensions().get::<ErrorDetail>().cloned() {
        Some(ErrorDetail(detail)) => {
            let status = response.status();
            (
                status,
                Json(json!({ "error": GENERIC_SERVER_ERROR, "detail": detail })),
            )
                .into_response()
        }
        None => response,
    }
}
