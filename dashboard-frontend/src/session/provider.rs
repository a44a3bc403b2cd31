use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::user::{Identity, UserProfile};

/// Session-change notification stream. Each event carries the most recent
/// provider-side session: `Some(identity)` or `None`. Dropping the receiver
/// cancels the subscription.
pub type SessionEvents = mpsc::UnboundedReceiver<Option<Identity>>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity provider configuration error: {0}")]
    Configuration(String),

    #[error("no profile record for user {0}")]
    ProfileNotFound(String),

    #[error("identity service error: {0}")]
    Upstream(#[from] anyhow::Error),
}

/// The external identity collaborator: initialization, session-change
/// notifications, sign-out, and profile lookup.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Initialize the underlying client. Safe to call any number of times;
    /// concurrent callers before the first completion share a single
    /// initialization.
    async fn ensure_initialized(&self) -> Result<(), ProviderError>;

    /// Register for session-change notifications. The provider delivers the
    /// current session on subscription and every change after it, in order.
    fn subscribe(&self) -> SessionEvents;

    /// Invalidate the provider-side session. The resulting state change is
    /// delivered through the subscription, never applied by the caller.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Look up the profile record for an identity.
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, ProviderError>;
}
