use askama::Template;
use axum::{
    extract::{OriginalUri, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use crate::middleware::gate::AUTH_COOKIE;
use crate::models::user::{Identity, UserProfile};
use crate::session::SessionState;
use crate::AppState;

#[derive(Template)]
#[template(path = "workspace.html")]
pub struct WorkspaceTemplate {
    pub user: Identity,
    pub profile: Option<UserProfile>,
    pub current_page: &'static str,
}

#[derive(Template)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {}

/// Dashboard shell. The gate's cookie check already ran, but the cookie is
/// only a coarse signal; the session lifecycle is authoritative, so an
/// Unauthenticated session redirects here even though the gate passed the
/// request through.
pub async fn workspace_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    OriginalUri(uri): OriginalUri,
) -> Response {
    // A cookie that outlived this process can still back a live provider
    // session; ask the provider before bouncing the user. The recovered
    // identity arrives through the notification stream, so this request
    // renders the placeholder and the next one sees the session.
    if !state.session.current().state.is_authenticated() {
        if let Some(cookie) = jar.get(AUTH_COOKIE) {
            match state.identity_client.restore(cookie.value()).await {
                Ok(Some(_)) => return LoadingTemplate {}.into_response(),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "session restore attempt failed");
                }
            }
        }
    }

    let snapshot = state.session.current();

    match snapshot.state {
        SessionState::Uninitialized | SessionState::Loading => {
            LoadingTemplate {}.into_response()
        }
        SessionState::Unauthenticated { .. } => {
            let target = format!("/?auth=required&redirect={}", uri.path());
            tracing::debug!(path = %uri.path(), "session not established, sending to landing");
            Redirect::to(&target).into_response()
        }
        SessionState::Authenticated { user, profile } => WorkspaceTemplate {
            user,
            profile,
            current_page: page_for(uri.path()),
        }
        .into_response(),
    }
}

fn page_for(path: &str) -> &'static str {
    if path.starts_with("/profile") {
        "profile"
    } else if path.starts_with("/settings") {
        "settings"
    } else {
        "workspace"
    }
}
