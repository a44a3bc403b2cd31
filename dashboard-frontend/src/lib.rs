pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;
pub mod startup;

use middleware::gate::RouteGate;
use services::identity_client::IdentityClient;
use session::SessionLifecycle;
use std::sync::Arc;

/// Shared application state: the identity client, the session lifecycle
/// bound to it, and the route gate tables.
#[derive(Clone)]
pub struct AppState {
    pub identity_client: Arc<IdentityClient>,
    pub session: Arc<SessionLifecycle>,
    pub route_gate: Arc<RouteGate>,
}

impl AppState {
    pub fn new(
        identity_client: Arc<IdentityClient>,
        session: Arc<SessionLifecycle>,
        route_gate: Arc<RouteGate>,
    ) -> Self {
        Self {
            identity_client,
            session,
            route_gate,
        }
    }
}
