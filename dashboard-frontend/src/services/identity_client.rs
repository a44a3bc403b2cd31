use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use service_core::observability::TracedClientExt;
use std::sync::Mutex;
use tokio::sync::{mpsc, OnceCell};

use crate::config::IdentityServiceSettings;
use crate::models::user::{Identity, UserProfile};
use crate::session::provider::{IdentityProvider, ProviderError, SessionEvents};

/// HTTP client for the identity service, doubling as the session-change
/// notification source: sign-in and sign-out flows announce the new session
/// to every live subscriber, and a fresh subscriber immediately receives the
/// last known session.
pub struct IdentityClient {
    client: Client,
    settings: IdentityServiceSettings,
    init: OnceCell<()>,
    last_session: Mutex<Option<Identity>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Option<Identity>>>>,
}

impl IdentityClient {
    pub fn new(settings: IdentityServiceSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
            init: OnceCell::new(),
            last_session: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.settings.url
    }

    pub fn public_url(&self) -> &str {
        &self.settings.public_url
    }

    /// Record and fan out a session change. Subscribers whose receivers are
    /// gone are pruned here.
    fn announce(&self, session: Option<Identity>) {
        if let Ok(mut last) = self.last_session.lock() {
            *last = session.clone();
        }
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.send(session.clone()).is_ok());
        }
    }

    fn validate_settings(&self) -> Result<(), ProviderError> {
        if self.settings.url.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "identity service url is not set".to_string(),
            ));
        }
        reqwest::Url::parse(&self.settings.url).map_err(|e| {
            ProviderError::Configuration(format!(
                "identity service url '{}' is invalid: {}",
                self.settings.url, e
            ))
        })?;
        Ok(())
    }

    /// Exchange credentials for a session. On success the token for the
    /// `auth-token` cookie is returned and the new identity is announced to
    /// subscribers.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(Identity, String), ProviderError> {
        self.ensure_initialized().await?;

        let url = format!("{}/auth/login", self.settings.url);
        let response = self
            .client
            .traced_post(&url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send POST request to {}: {}", url, e);
                ProviderError::Upstream(anyhow!("HTTP request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Upstream(anyhow!(
                "sign-in rejected with status {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Upstream(anyhow!("malformed sign-in response: {}", e)))?;

        let token = body["access_token"]
            .as_str()
            .ok_or_else(|| ProviderError::Upstream(anyhow!("sign-in response missing access_token")))?
            .to_string();
        let identity: Identity = serde_json::from_value(body["user"].clone())
            .map_err(|e| ProviderError::Upstream(anyhow!("sign-in response missing user: {}", e)))?;

        self.announce(Some(identity.clone()));

        Ok((identity, token))
    }

    /// Ask the identity service which session stands behind a presented
    /// token and publish the answer. This rehydrates the lifecycle when a
    /// browser returns with a cookie that outlived this process.
    ///
    /// A definitive rejection of the token is announced as a signed-out
    /// session; transient transport failures announce nothing.
    pub async fn restore(&self, token: &str) -> Result<Option<Identity>, ProviderError> {
        self.ensure_initialized().await?;

        let url = format!("{}/auth/session", self.settings.url);
        let response = self
            .client
            .traced_get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send GET request to {}: {}", url, e);
                ProviderError::Upstream(anyhow!("HTTP request failed: {}", e))
            })?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.announce(None);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Upstream(anyhow!(
                "session lookup failed with status {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Upstream(anyhow!("malformed session response: {}", e)))?;
        let identity: Identity = serde_json::from_value(body["user"].clone())
            .map_err(|e| ProviderError::Upstream(anyhow!("session response missing user: {}", e)))?;

        self.announce(Some(identity.clone()));

        Ok(Some(identity))
    }

    /// Create an account. The identity service sends its own verification
    /// mail; no session is established here.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        self.ensure_initialized().await?;

        let url = format!("{}/auth/register", self.settings.url);
        let response = self
            .client
            .traced_post(&url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send POST request to {}: {}", url, e);
                ProviderError::Upstream(anyhow!("HTTP request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Upstream(anyhow!(
                "registration rejected with status {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    async fn ensure_initialized(&self) -> Result<(), ProviderError> {
        // Concurrent first-time callers coalesce onto one validation.
        self.init
            .get_or_try_init(|| async { self.validate_settings() })
            .await?;
        Ok(())
    }

    fn subscribe(&self) -> SessionEvents {
        let (tx, rx) = mpsc::unbounded_channel();

        // New subscribers start from the current session, then see every
        // change in order.
        let current = self
            .last_session
            .lock()
            .map(|last| last.clone())
            .unwrap_or(None);
        let _ = tx.send(current);

        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }

        rx
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.ensure_initialized().await?;

        let user_id = self
            .last_session
            .lock()
            .ok()
            .and_then(|last| last.as_ref().map(|identity| identity.id.clone()));

        let url = format!("{}/auth/logout", self.settings.url);
        let response = self
            .client
            .traced_post(&url)
            .bearer_auth(self.settings.service_api_key.expose_secret())
            .json(&serde_json::json!({ "user_id": user_id }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send POST request to {}: {}", url, e);
                ProviderError::Upstream(anyhow!("HTTP request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Upstream(anyhow!(
                "sign-out rejected with status {}",
                response.status()
            )));
        }

        // The provider-side session is gone; notify through the stream.
        self.announce(None);

        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, ProviderError> {
        let url = format!("{}/users/{}/profile", self.settings.url, user_id);
        let response = self
            .client
            .traced_get(&url)
            .bearer_auth(self.settings.service_api_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send GET request to {}: {}", url, e);
                ProviderError::Upstream(anyhow!("HTTP request failed: {}", e))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::ProfileNotFound(user_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(ProviderError::Upstream(anyhow!(
                "profile lookup failed with status {}",
                response.status()
            )));
        }

        response
            .json::<UserProfile>()
            .await
            .map_err(|e| ProviderError::Upstream(anyhow!("malformed profile response: {}", e)))
    }
}
