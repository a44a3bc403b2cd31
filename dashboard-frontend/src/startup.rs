use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use service_core::observability::metrics::metrics_middleware;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    app::{health_check, index, not_found},
    auth::{login_handler, login_page, logout_handler, signup_handler, signup_page},
    dashboard::workspace_handler,
    metrics::metrics,
};
use crate::middleware::gate::route_gate_middleware;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/login", get(login_page).post(login_handler))
        .route("/signup", get(signup_page).post(signup_handler))
        .route("/logout", get(logout_handler))
        .route("/dashboard/workspace", get(workspace_handler))
        .route("/profile", get(workspace_handler))
        .route("/settings", get(workspace_handler))
        .nest_service("/static", ServeDir::new("dashboard-frontend/static"))
        // The gate must also see paths with no route of their own
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), route_gate_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
