use async_trait::async_trait;
use axum::Router;
use dashboard_frontend::config::{IdentityServiceSettings, RouteGateSettings};
use dashboard_frontend::middleware::gate::RouteGate;
use dashboard_frontend::models::user::{Identity, UserProfile};
use dashboard_frontend::services::identity_client::IdentityClient;
use dashboard_frontend::session::provider::{IdentityProvider, ProviderError, SessionEvents};
use dashboard_frontend::session::SessionLifecycle;
use dashboard_frontend::startup::build_router;
use dashboard_frontend::AppState;
use secrecy::Secret;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell};

/// Channel-backed identity provider. Emits nothing on its own; tests drive
/// the notification stream through `emit`.
pub struct MockProvider {
    fail_init: bool,
    fail_profile: bool,
    init_delay: Duration,
    profile: Option<UserProfile>,
    init_runs: AtomicUsize,
    sign_out_calls: AtomicUsize,
    init: OnceCell<()>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Option<Identity>>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            fail_init: false,
            fail_profile: false,
            init_delay: Duration::ZERO,
            profile: None,
            init_runs: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            init: OnceCell::new(),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_profile(profile: UserProfile) -> Self {
        Self {
            profile: Some(profile),
            ..Self::new()
        }
    }

    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Self::new()
        }
    }

    pub fn failing_profile() -> Self {
        Self {
            fail_profile: true,
            ..Self::new()
        }
    }

    pub fn with_init_delay(delay: Duration) -> Self {
        Self {
            init_delay: delay,
            ..Self::new()
        }
    }

    /// Deliver a session-change notification to every subscriber.
    pub fn emit(&self, session: Option<Identity>) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(session.clone()).is_ok());
    }

    pub fn live_subscribers(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    pub fn init_runs(&self) -> usize {
        self.init_runs.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn ensure_initialized(&self) -> Result<(), ProviderError> {
        self.init
            .get_or_try_init(|| async {
                tokio::time::sleep(self.init_delay).await;
                self.init_runs.fetch_add(1, Ordering::SeqCst);
                if self.fail_init {
                    Err(ProviderError::Configuration(
                        "mock provider configured to fail".to_string(),
                    ))
                } else {
                    Ok(())
                }
            })
            .await?;
        Ok(())
    }

    fn subscribe(&self) -> SessionEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        // The null notification is the test's to send; a real provider
        // confirms revocation through its own stream.
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, ProviderError> {
        if self.fail_profile {
            return Err(ProviderError::Upstream(anyhow::anyhow!(
                "mock profile fetch failed"
            )));
        }
        self.profile
            .clone()
            .ok_or_else(|| ProviderError::ProfileNotFound(user_id.to_string()))
    }
}

pub fn identity(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        display_name: None,
    }
}

pub fn profile_for(id: &str) -> UserProfile {
    UserProfile {
        user_id: id.to_string(),
        plan: "pro".to_string(),
        display_name: None,
        prompt_credits: Some(250),
        created_at: None,
    }
}

pub fn identity_settings() -> IdentityServiceSettings {
    IdentityServiceSettings {
        url: "http://localhost:9020".to_string(),
        public_url: "http://localhost:9020".to_string(),
        service_api_key: Secret::new("test-key".to_string()),
        profile_timeout_ms: 1_000,
    }
}

/// A real router over a mock-provider-backed session lifecycle.
pub async fn test_app(provider: Arc<MockProvider>) -> (AppState, Router) {
    let identity_client = Arc::new(IdentityClient::new(identity_settings()));
    let session = Arc::new(
        SessionLifecycle::mount(
            provider as Arc<dyn IdentityProvider>,
            Duration::from_millis(500),
        )
        .await,
    );
    let route_gate = Arc::new(RouteGate::from_settings(&RouteGateSettings::default()));

    let state = AppState::new(identity_client, session, route_gate);
    (state.clone(), build_router(state))
}
