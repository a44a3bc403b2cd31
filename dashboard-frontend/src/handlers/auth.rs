use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use validator::Validate;

use crate::middleware::gate::AUTH_COOKIE;
use crate::AppState;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub redirect: Option<String>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub error: Option<String>,
    pub created: bool,
}

#[derive(Deserialize)]
pub struct LoginPageParams {
    pub redirect: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub redirect: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

/// Only same-site paths may be used as a post-login target.
fn sanitize_redirect(redirect: Option<String>) -> Option<String> {
    redirect.filter(|r| r.starts_with('/') && !r.starts_with("//"))
}

pub async fn login_page(Query(params): Query<LoginPageParams>) -> impl IntoResponse {
    LoginTemplate {
        error: None,
        redirect: sanitize_redirect(params.redirect),
    }
}

pub async fn signup_page() -> impl IntoResponse {
    SignupTemplate {
        error: None,
        created: false,
    }
}

pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(payload): Form<LoginRequest>,
) -> Response {
    if payload.validate().is_err() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            LoginTemplate {
                error: Some("Enter a valid email and a password of at least 8 characters".to_string()),
                redirect: sanitize_redirect(payload.redirect),
            },
        )
            .into_response();
    }

    match state
        .identity_client
        .sign_in(&payload.email, &payload.password)
        .await
    {
        Ok((identity, token)) => {
            tracing::info!(
                user_id = %identity.id,
                email = %identity.email,
                "user signed in"
            );

            let cookie = Cookie::build((AUTH_COOKIE, token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();

            let target = sanitize_redirect(payload.redirect)
                .unwrap_or_else(|| state.route_gate.landing_path().to_string());

            (jar.add(cookie), Redirect::to(&target)).into_response()
        }
        Err(e) => {
            tracing::warn!(email = %payload.email, error = %e, "sign-in failed");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                LoginTemplate {
                    error: Some("Invalid email or password".to_string()),
                    redirect: sanitize_redirect(payload.redirect),
                },
            )
                .into_response()
        }
    }
}

pub async fn signup_handler(
    State(state): State<AppState>,
    Form(payload): Form<SignupRequest>,
) -> Response {
    if payload.validate().is_err() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            SignupTemplate {
                error: Some("Enter a valid email and a password of at least 8 characters".to_string()),
                created: false,
            },
        )
            .into_response();
    }

    match state
        .identity_client
        .register(&payload.email, &payload.password)
        .await
    {
        Ok(()) => SignupTemplate {
            error: None,
            created: true,
        }
        .into_response(),
        Err(e) => {
            tracing::warn!(email = %payload.email, error = %e, "registration failed");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                SignupTemplate {
                    error: Some("Registration failed. The email might already be in use".to_string()),
                    created: false,
                },
            )
                .into_response()
        }
    }
}

pub async fn logout_handler(State(state): State<AppState>, jar: CookieJar) -> Response {
    // Revocation failures don't keep the user signed in locally; the cookie
    // goes away regardless and the error is logged.
    if let Err(e) = state.session.sign_out().await {
        tracing::error!(error = %e, "provider sign-out failed");
    }

    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");

    (jar.remove(cookie), Redirect::to("/")).into_response()
}
