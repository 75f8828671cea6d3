//! Router construction and shared application state.

use std::{any::Any, sync::Arc};

use axum::{
    Json, Router, middleware as axum_middleware,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::{
    error::{ErrorDetail, GENERIC_SERVER_ERROR},
    handlers,
    identity::TokenVerifier,
    middleware,
    store::LedgerStore,
};

/// State shared with every handler and middleware.
///
/// Built once by the composition root; nothing here is global.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub verifier: Arc<dyn TokenVerifier>,

    /// Add internal error detail to 500 bodies (development only)
    pub expose_error_details: bool,
}

/// Build the HTTP router.
///
/// # Routes
///
/// Public:
/// - `GET /api/health`
///
/// Behind bearer authentication:
/// - `GET|POST /api/profile`
/// - `GET|POST /api/balance`
/// - `GET|POST /api/expense`, `PUT|DELETE /api/expense/{id}` (also under `/api/expenses`)
/// - `GET|POST /api/budgets`, `DELETE /api/budgets/{id}`
/// - `GET|POST /api/recurring`, `DELETE /api/recurring/{id}`, `POST /api/recurring/apply`
/// - `GET /api/stats`, `GET /api/stats/budget/check`
pub fn build_router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        .route(
            "/api/profile",
            get(handlers::profile::get_profile).post(handlers::profile::save_profile),
        )
        .route(
            "/api/balance",
            get(handlers::balance::get_balance).post(handlers::balance::set_balance),
        )
        .route(
            "/api/budgets",
            get(handlers::budgets::list_budgets).post(handlers::budgets::save_budget),
        )
        .route("/api/budgets/{id}", delete(handlers::budgets::delete_budget))
        .route(
            "/api/recurring",
            get(handlers::recurring::list_recurring).post(handlers::recurring::create_recurring),
        )
        .route(
            "/api/recurring/apply",
            post(handlers::recurring::apply_recurring),
        )
        .route(
            "/api/recurring/{id}",
            delete(handlers::recurring::delete_recurring),
        )
        .route("/api/stats", get(handlers::stats::get_stats))
        .route(
            "/api/stats/budget/check",
            get(handlers::stats::check_budgets),
        );

    // Expenses are served under both the singular and the plural path
    let authenticated_routes = ["/api/expense", "/api/expenses"]
        .into_iter()
        .fold(authenticated_routes, |router, base| {
            router
                .route(
                    base,
                    post(handlers::expenses::add_expense).get(handlers::expenses::list_expenses),
                )
                .route(
                    &format!("{base}/{{id}}"),
                    put(handlers::expenses::edit_expense).delete(handlers::expenses::delete_expense),
                )
        })
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/api/health", get(handlers::health::health_check))
        .merge(authenticated_routes)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::error_details::error_details_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answer a panicking handler with the generic 500 body.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "handler panicked");

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": GENERIC_SERVER_ERROR })),
    )
        .into_response();
    response.extensions_mut().insert(ErrorDetail(detail));
    response
}
