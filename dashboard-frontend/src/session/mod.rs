//! Session lifecycle: establishes, observes, and tears down the
//! authenticated session for the lifetime of the process.
//!
//! All state changes flow through one consumer task that drains the
//! provider's notification stream in arrival order, so a newer notification
//! can never be overwritten by a staler one.

pub mod provider;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::user::{Identity, UserProfile};
use provider::{IdentityProvider, ProviderError, SessionEvents};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Authenticated {
        user: Identity,
        profile: Option<UserProfile>,
    },
    Unauthenticated {
        diagnostic: Option<String>,
    },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn is_settled(&self) -> bool {
        !matches!(
            self,
            SessionState::Uninitialized | SessionState::Loading
        )
    }

    pub fn user(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }
}

/// What consumers observe: the state plus when it last changed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub changed_at: DateTime<Utc>,
}

impl SessionSnapshot {
    fn new(state: SessionState) -> Self {
        Self {
            state,
            changed_at: Utc::now(),
        }
    }
}

/// Owns the session state machine and the provider subscription.
///
/// `mount` transitions Uninitialized -> Loading, initializes the provider
/// (degrading to Unauthenticated on configuration errors), subscribes, and
/// spawns the consumer task. `unmount` cancels the subscription and awaits
/// the task; that is the resource release boundary.
pub struct SessionLifecycle {
    provider: Arc<dyn IdentityProvider>,
    state_rx: watch::Receiver<SessionSnapshot>,
    cancel: CancellationToken,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl SessionLifecycle {
    pub async fn mount(provider: Arc<dyn IdentityProvider>, profile_timeout: Duration) -> Self {
        let (state_tx, state_rx) =
            watch::channel(SessionSnapshot::new(SessionState::Uninitialized));

        publish(&state_tx, SessionState::Loading);

        if let Err(e) = provider.ensure_initialized().await {
            tracing::error!(error = %e, "identity provider initialization failed");
            publish(
                &state_tx,
                SessionState::Unauthenticated {
                    diagnostic: Some(e.to_string()),
                },
            );
        }

        let events = provider.subscribe();
        let cancel = CancellationToken::new();
        let consumer = tokio::spawn(consume_events(
            events,
            state_tx,
            provider.clone(),
            profile_timeout,
            cancel.child_token(),
        ));

        Self {
            provider,
            state_rx,
            cancel,
            consumer: Mutex::new(Some(consumer)),
        }
    }

    /// A receiver over session snapshots for consumers to observe or await.
    pub fn state(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_rx.clone()
    }

    pub fn current(&self) -> SessionSnapshot {
        self.state_rx.borrow().clone()
    }

    /// Ask the provider to invalidate the session. The transition to
    /// Unauthenticated happens only when the provider's own notification
    /// arrives; applying it here would race an in-flight callback.
    pub async fn sign_out(&self) -> Result<(), ProviderError> {
        self.provider.sign_out().await
    }

    /// Cancel the subscription and wait for the consumer task to finish.
    /// No state changes are published after this returns.
    pub async fn unmount(&self) {
        self.cancel.cancel();
        let handle = self.consumer.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "session consumer task did not shut down cleanly");
            }
        }
    }
}

fn publish(state_tx: &watch::Sender<SessionSnapshot>, state: SessionState) {
    tracing::debug!(state = ?state_kind(&state), "session state change");
    let _ = state_tx.send(SessionSnapshot::new(state));
}

fn state_kind(state: &SessionState) -> &'static str {
    match state {
        SessionState::Uninitialized => "uninitialized",
        SessionState::Loading => "loading",
        SessionState::Authenticated { .. } => "authenticated",
        SessionState::Unauthenticated { .. } => "unauthenticated",
    }
}

async fn consume_events(
    mut events: SessionEvents,
    state_tx: watch::Sender<SessionSnapshot>,
    provider: Arc<dyn IdentityProvider>,
    profile_timeout: Duration,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                // Provider closed the stream; nothing further will arrive.
                None => break,
            },
        };

        match event {
            Some(user) => {
                publish(
                    &state_tx,
                    SessionState::Authenticated {
                        user: user.clone(),
                        profile: None,
                    },
                );

                attach_profile(&state_tx, provider.as_ref(), &user, profile_timeout).await;
            }
            None => publish(&state_tx, SessionState::Unauthenticated { diagnostic: None }),
        }
    }
}

/// Best-effort profile decoration. Identity is already proven, so every
/// failure path leaves the session Authenticated with a null profile; the
/// next notification retries implicitly.
async fn attach_profile(
    state_tx: &watch::Sender<SessionSnapshot>,
    provider: &dyn IdentityProvider,
    user: &Identity,
    profile_timeout: Duration,
) {
    let fetched = tokio::time::timeout(profile_timeout, provider.fetch_profile(&user.id)).await;

    let profile = match fetched {
        Ok(Ok(profile)) => profile,
        Ok(Err(ProviderError::ProfileNotFound(_))) => {
            tracing::debug!(user_id = %user.id, "no profile record yet");
            return;
        }
        Ok(Err(e)) => {
            tracing::warn!(user_id = %user.id, error = %e, "profile fetch failed");
            return;
        }
        Err(_) => {
            tracing::warn!(user_id = %user.id, "profile fetch timed out");
            return;
        }
    };

    // Attach without a state regression, and only if this identity is still
    // the current one.
    state_tx.send_if_modified(|snapshot| match &mut snapshot.state {
        SessionState::Authenticated {
            user: current,
            profile: slot,
        } if current.id == user.id => {
            *slot = Some(profile.clone());
            snapshot.changed_at = Utc::now();
            true
        }
        _ => false,
    });
}
