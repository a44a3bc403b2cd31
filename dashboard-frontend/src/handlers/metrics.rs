use axum::{http::header, response::IntoResponse};
use service_core::error::AppError;
use service_core::observability::metrics::render_metrics;

pub async fn metrics() -> Result<impl IntoResponse, AppError> {
    let body = render_metrics()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
