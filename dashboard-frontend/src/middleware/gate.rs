use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use crate::config::RouteGateSettings;
use crate::AppState;

/// The gate keys on presence of this cookie only. Contents and expiry are
/// never inspected here; token verification belongs to the session lifecycle
/// and the backend services.
pub const AUTH_COOKIE: &str = "auth-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    AuthOnly,
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    PassThrough,
    Redirect(String),
}

/// Route classification tables plus the authenticated landing path.
/// Built once from settings and immutable afterwards.
#[derive(Debug, Clone)]
pub struct RouteGate {
    protected_prefixes: Vec<String>,
    auth_only_prefixes: Vec<String>,
    exempt_prefixes: Vec<String>,
    landing_path: String,
}

impl RouteGate {
    pub fn from_settings(settings: &RouteGateSettings) -> Self {
        Self {
            protected_prefixes: settings.protected_prefixes.clone(),
            auth_only_prefixes: settings.auth_only_prefixes.clone(),
            exempt_prefixes: settings.exempt_prefixes.clone(),
            landing_path: settings.landing_path.clone(),
        }
    }

    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        if self.protected_prefixes.iter().any(|p| path.starts_with(p)) {
            RouteClass::Protected
        } else if self.auth_only_prefixes.iter().any(|p| path.starts_with(p)) {
            RouteClass::AuthOnly
        } else {
            RouteClass::Unclassified
        }
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.exempt_prefixes.iter().any(|p| path.starts_with(p))
    }

    /// The decision table. Pure over (path, cookie-presence); absence of a
    /// matching rule defaults to pass-through.
    pub fn decide(&self, path: &str, auth_signal: bool) -> GateDecision {
        if self.is_exempt(path) {
            return GateDecision::PassThrough;
        }

        if path == "/" && auth_signal {
            return GateDecision::Redirect(self.landing_path.clone());
        }

        match self.classify(path) {
            RouteClass::Protected if !auth_signal => {
                GateDecision::Redirect(format!("/?auth=required&redirect={}", path))
            }
            RouteClass::AuthOnly if auth_signal => {
                GateDecision::Redirect(self.landing_path.clone())
            }
            _ => GateDecision::PassThrough,
        }
    }
}

pub async fn route_gate_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();
    let auth_signal = jar.get(AUTH_COOKIE).is_some();

    match state.route_gate.decide(path, auth_signal) {
        GateDecision::PassThrough => next.run(request).await,
        GateDecision::Redirect(target) => {
            tracing::debug!(path = %path, target = %target, "route gate redirect");
            Redirect::to(&target).into_response()
        }
    }
}
