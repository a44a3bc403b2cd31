use askama::Template;
use axum::{extract::Query, response::IntoResponse};
use serde::Deserialize;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub auth_required: bool,
    pub redirect: Option<String>,
}

#[derive(Deserialize)]
pub struct IndexParams {
    pub auth: Option<String>,
    pub redirect: Option<String>,
}

/// Landing page. `auth=required` arrives here from the route gate (or the
/// dashboard shell) with a `redirect` back-pointer for after sign-in.
pub async fn index(Query(params): Query<IndexParams>) -> impl IntoResponse {
    IndexTemplate {
        auth_required: params.auth.as_deref() == Some("required"),
        redirect: params.redirect,
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn not_found() -> impl IntoResponse {
    (axum::http::StatusCode::NOT_FOUND, "Not Found")
}
