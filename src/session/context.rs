use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::cache::ProfileCache;
use super::config::{AuthConfig, AuthMode};
use super::error::AuthError;
use super::traits::{AuthProvider, ProfileStore};
use super::types::{AuthEvent, Identity, OAuthOptions, OAuthRedirect, Session, SessionState};
use crate::domain::{is_allowed_domain, normalize_domain};
use crate::types::{Email, Profile};

/// Explicit session context: the auth provider, the profile store, the
/// profile cache and the login policy, passed to the guard and to any view
/// that needs the caller's identity.
///
/// Cloning is cheap and clones share the same cache.
pub struct SessionContext<A, P> {
    auth: Arc<A>,
    profiles: Arc<P>,
    cache: Arc<ProfileCache>,
    config: Arc<AuthConfig>,
}

// Manual Clone: avoid derive adding `A: Clone, P: Clone` bounds.
impl<A, P> Clone for SessionContext<A, P> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
            profiles: self.profiles.clone(),
            cache: self.cache.clone(),
            config: self.config.clone(),
        }
    }
}

impl<A: AuthProvider, P: ProfileStore> SessionContext<A, P> {
    #[must_use]
    pub fn new(auth: A, profiles: P, config: AuthConfig) -> Self {
        Self::from_shared(Arc::new(auth), Arc::new(profiles), config)
    }

    /// Build from collaborators the caller keeps handles to.
    #[must_use]
    pub fn from_shared(auth: Arc<A>, profiles: Arc<P>, config: AuthConfig) -> Self {
        Self {
            auth,
            profiles,
            cache: Arc::new(ProfileCache::new(config.cache_ttl)),
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    #[must_use]
    pub fn auth(&self) -> &A {
        &self.auth
    }

    // ── Resolution ─────────────────────────────────────────────────────

    /// Determine whether the caller is authenticated and which role they hold.
    ///
    /// Answers from the profile cache when it holds the session's email;
    /// otherwise looks the profile up, provisioning a default one on first
    /// sight, and caches the result.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Provider`] if the session could not be read
    /// - [`AuthError::DomainNotAllowed`] if the session email is outside the
    ///   allowed domains (the session is signed out)
    /// - [`AuthError::ProfileStore`] if the profile lookup failed
    /// - [`AuthError::ProfileInactive`] / [`AuthError::ProfileNotFound`] if no
    ///   usable profile exists (the session is signed out)
    ///
    /// The profile cache is cleared on every error path.
    pub async fn resolve(&self) -> Result<SessionState, AuthError> {
        let session = match self.auth.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.cache.clear();
                return Ok(SessionState::Anonymous);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session from auth provider");
                self.cache.clear();
                return Err(AuthError::provider(e));
            }
        };

        self.ensure_allowed(&session.email).await?;
        let profile = self.profile_for(&session).await?;
        Ok(SessionState::Authenticated(Identity::from(&profile)))
    }

    /// Identity of the signed-in caller.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] when there is no session, or any
    /// error from [`resolve`](Self::resolve).
    pub async fn current_identity(&self) -> Result<Identity, AuthError> {
        match self.resolve().await? {
            SessionState::Authenticated(identity) => Ok(identity),
            SessionState::Anonymous => Err(AuthError::Unauthenticated),
        }
    }

    async fn profile_for(&self, session: &Session) -> Result<Profile, AuthError> {
        if let Some(profile) = self.cache.get(&session.email) {
            tracing::debug!(email = %session.email, "Profile cache hit");
            return Ok(profile);
        }

        let found = match self.profiles.find_by_email(&session.email).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(error = %e, email = %session.email, "Profile lookup failed");
                self.cache.clear();
                return Err(AuthError::store(e));
            }
        };

        let profile = match found {
            Some(profile) => profile,
            None => self.provision(session).await?,
        };

        self.cache.put(profile.clone());
        Ok(profile)
    }

    async fn provision(&self, session: &Session) -> Result<Profile, AuthError> {
        let email = session.email.to_string();

        if !self.config.auto_provision {
            tracing::warn!(email = %email, "No profile and provisioning disabled");
            self.invalidate().await;
            return Err(AuthError::ProfileNotFound { email });
        }

        let profile = Profile::provisioned(session.email.clone(), session.display_name.as_deref());
        tracing::info!(email = %email, "Provisioning default profile on first sign-in");

        let stored = match self.profiles.upsert(profile).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(error = %e, email = %email, "Profile provisioning failed");
                self.cache.clear();
                return Err(AuthError::store(e));
            }
        };

        match stored {
            Some(profile) if profile.active => Ok(profile),
            // A row already existed but the active-only lookup missed it
            _ => {
                tracing::warn!(email = %email, "Profile exists but is inactive");
                self.invalidate().await;
                Err(AuthError::ProfileInactive { email })
            }
        }
    }

    async fn ensure_allowed(&self, email: &Email) -> Result<(), AuthError> {
        if is_allowed_domain(email, &self.config.allowed_domains) {
            return Ok(());
        }
        tracing::warn!(email = %email, "Email domain not allowed; signing out");
        self.invalidate().await;
        Err(AuthError::DomainNotAllowed {
            email: email.to_string(),
        })
    }

    /// Sign out and forget the cached profile, logging rather than returning sign-out failures.
    async fn invalidate(&self) {
        self.cache.clear();
        if let Err(e) = self.auth.sign_out().await {
            tracing::warn!(error = %e, "Sign-out failed while invalidating session");
        }
    }

    // ── Login ──────────────────────────────────────────────────────────

    /// Sign in with email and password.
    ///
    /// The domain is checked before the provider is contacted, so an address
    /// outside the allowed domains never produces a session.
    ///
    /// # Errors
    ///
    /// [`AuthError::ModeDisabled`] outside password mode,
    /// [`AuthError::InvalidEmail`], [`AuthError::DomainNotAllowed`],
    /// [`AuthError::Provider`] on rejected credentials, or any resolution error.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionState, AuthError> {
        if self.config.mode != AuthMode::Password {
            return Err(AuthError::ModeDisabled("password"));
        }

        let email: Email = email
            .parse()
            .map_err(|_| AuthError::InvalidEmail(email.to_string()))?;

        if !is_allowed_domain(&email, &self.config.allowed_domains) {
            tracing::warn!(email = %email, "Password sign-in rejected: domain not allowed");
            return Err(AuthError::DomainNotAllowed {
                email: email.to_string(),
            });
        }

        let session = self
            .auth
            .sign_in_with_password(&email, password)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, email = %email, "Password sign-in failed");
                AuthError::provider(e)
            })?;

        self.after_sign_in(session).await
    }

    /// Start an OAuth sign-in. Keep the returned verifier until the callback.
    ///
    /// With exactly one allowed domain, the `hd` hint is added so the
    /// provider's account chooser only offers that domain.
    ///
    /// # Errors
    ///
    /// [`AuthError::ModeDisabled`] outside OAuth mode, [`AuthError::Config`]
    /// without a redirect URL, or [`AuthError::Provider`].
    pub fn begin_oauth_login(&self) -> Result<OAuthRedirect, AuthError> {
        if self.config.mode != AuthMode::OAuth {
            return Err(AuthError::ModeDisabled("OAuth"));
        }

        let redirect_to = self
            .config
            .oauth_redirect
            .clone()
            .ok_or_else(|| AuthError::Config("OAuth redirect URL is not configured".into()))?;

        let mut options =
            OAuthOptions::new(redirect_to).with_scopes(self.config.oauth_scopes.clone());
        if let [domain] = self.config.allowed_domains.as_slice() {
            options = options.with_query_param("hd", normalize_domain(domain));
        }

        self.auth
            .sign_in_with_oauth(&self.config.oauth_provider, &options)
            .map_err(AuthError::provider)
    }

    /// Finish an OAuth sign-in from the callback's `code`.
    ///
    /// # Errors
    ///
    /// [`AuthError::ModeDisabled`] outside OAuth mode, [`AuthError::Provider`]
    /// if the exchange fails, [`AuthError::DomainNotAllowed`] if the provider
    /// authenticated an address outside the allowed domains (the session is
    /// signed out), or any resolution error.
    pub async fn complete_oauth_login(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<SessionState, AuthError> {
        if self.config.mode != AuthMode::OAuth {
            return Err(AuthError::ModeDisabled("OAuth"));
        }

        let session = self
            .auth
            .exchange_code_for_session(code, code_verifier)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "OAuth code exchange failed");
                AuthError::provider(e)
            })?;

        self.after_sign_in(session).await
    }

    async fn after_sign_in(&self, session: Session) -> Result<SessionState, AuthError> {
        // A new sign-in never inherits the previous identity's cached role
        self.cache.clear();
        self.ensure_allowed(&session.email).await?;

        let profile = self.profile_for(&session).await?;
        tracing::info!(email = %profile.email, role = %profile.role, "Signed in");
        Ok(SessionState::Authenticated(Identity::from(&profile)))
    }

    /// Sign out. The profile cache is cleared even if the provider call fails.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`] if the provider rejects the sign-out.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let result = self.auth.sign_out().await;
        self.cache.clear();
        result.map_err(|e| {
            tracing::warn!(error = %e, "Sign-out failed");
            AuthError::provider(e)
        })
    }

    // ── Auth-state events ──────────────────────────────────────────────

    /// Keep the profile cache consistent with an auth-state change.
    pub fn handle_auth_event(&self, event: &AuthEvent) {
        match event {
            AuthEvent::SignedOut => {
                tracing::debug!("Signed out; clearing profile cache");
                self.cache.clear();
            }
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => {
                if self.cache.get(&session.email).is_none() {
                    self.cache.clear();
                }
            }
        }
    }

    /// Spawn a task applying provider auth-state changes until the provider drops its sender.
    pub fn watch_auth_events(&self) -> JoinHandle<()> {
        let mut events = self.auth.on_auth_state_change();
        let context = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => context.handle_auth_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Missed auth events; clearing profile cache");
                        context.cache.clear();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
