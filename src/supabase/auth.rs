use std::sync::Arc;

use parking_lot::RwLock;
use time::OffsetDateTime;
use tokio::sync::broadcast;

use super::client::SupabaseClient;
use super::profiles::SupabaseProfiles;
use crate::error::Error;
use crate::session::{AuthEvent, AuthProvider, BoxError, OAuthOptions, OAuthRedirect, Session};
use crate::types::Email;

/// Refresh this many seconds before the access token expires.
const REFRESH_LEEWAY_SECS: i64 = 30;

/// [`AuthProvider`] backed by Supabase GoTrue.
///
/// Holds the current session in memory and broadcasts every transition.
/// Cloning shares the session and the event channel.
#[derive(Clone)]
pub struct SupabaseAuth {
    client: Arc<SupabaseClient>,
    current: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseAuth {
    #[must_use]
    pub fn new(client: SupabaseClient) -> Self {
        Self::from_shared(Arc::new(client))
    }

    #[must_use]
    pub fn from_shared(client: Arc<SupabaseClient>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            client,
            current: Arc::new(RwLock::new(None)),
            events,
        }
    }

    /// Profile store that queries with this provider's current access token.
    #[must_use]
    pub fn profiles(&self) -> SupabaseProfiles {
        SupabaseProfiles::new(Arc::clone(&self.client), Arc::clone(&self.current))
    }

    /// Adopt a session persisted by the host (e.g. from local storage) without a sign-in round trip.
    pub fn restore(&self, session: Session) {
        self.store(session, AuthEvent::SignedIn);
    }

    /// Session currently held, without refreshing it.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    fn store(&self, session: Session, event: fn(Session) -> AuthEvent) {
        *self.current.write() = Some(session.clone());
        let _ = self.events.send(event(session));
    }

    fn clear(&self) {
        let had_session = self.current.write().take().is_some();
        if had_session {
            let _ = self.events.send(AuthEvent::SignedOut);
        }
    }

    async fn refresh(&self, session: Session) -> Result<Option<Session>, Error> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            tracing::debug!(email = %session.email, "session expired without refresh token");
            self.clear();
            return Ok(None);
        };

        match self.client.refresh_session(refresh_token).await {
            Ok(response) => {
                let refreshed = response.into_session()?;
                tracing::debug!(email = %refreshed.email, "session refreshed");
                self.store(refreshed.clone(), AuthEvent::TokenRefreshed);
                Ok(Some(refreshed))
            }
            Err(e) if e.status().is_some_and(|s| (400..500).contains(&s)) => {
                tracing::info!(email = %session.email, error = %e, "refresh token rejected, signing out");
                self.clear();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl AuthProvider for SupabaseAuth {
    async fn get_session(&self) -> Result<Option<Session>, BoxError> {
        let Some(session) = self.current() else {
            return Ok(None);
        };

        let deadline = OffsetDateTime::now_utc() + time::Duration::seconds(REFRESH_LEEWAY_SECS);
        if !session.is_expired_at(deadline) {
            return Ok(Some(session));
        }

        Ok(self.refresh(session).await?)
    }

    async fn sign_in_with_password(&self, email: &Email, password: &str) -> Result<Session, BoxError> {
        let response = self
            .client
            .sign_in_with_password(email.as_str(), password)
            .await?;
        let session = response.into_session()?;
        self.store(session.clone(), AuthEvent::SignedIn);
        Ok(session)
    }

    fn sign_in_with_oauth(
        &self,
        provider: &str,
        options: &OAuthOptions,
    ) -> Result<OAuthRedirect, BoxError> {
        Ok(self.client.authorization_url(provider, options)?)
    }

    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<Session, BoxError> {
        let response = self.client.exchange_code(code, code_verifier).await?;
        let session = response.into_session()?;
        self.store(session.clone(), AuthEvent::SignedIn);
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BoxError> {
        let Some(session) = self.current() else {
            return Ok(());
        };
        // The local session is gone even if the server call fails
        self.clear();
        self.client.sign_out(&session.access_token).await?;
        Ok(())
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
