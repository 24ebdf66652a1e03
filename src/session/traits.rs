use std::future::Future;

use tokio::sync::broadcast;

use super::types::{AuthEvent, OAuthOptions, OAuthRedirect, Session};
use crate::types::{Email, Profile};

/// Boxed error returned by consumer-implemented collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// External authentication service.
///
/// The provider owns the session: it creates it on sign-in, remembers it,
/// refreshes it and destroys it on sign-out. The crate only reads it.
///
/// # Example
///
/// ```rust,ignore
/// impl AuthProvider for MyAuth {
///     async fn get_session(&self) -> Result<Option<Session>, BoxError> {
///         Ok(self.stored.read().clone())
///     }
///     // ...
/// }
/// ```
pub trait AuthProvider: Send + Sync + 'static {
    /// Current session, or `None` when signed out or expired beyond refresh.
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, BoxError>> + Send;

    /// Sign in with email and password.
    fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> impl Future<Output = Result<Session, BoxError>> + Send;

    /// Build the redirect that starts an OAuth sign-in with `provider` (e.g. `"google"`).
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot build an authorize URL.
    fn sign_in_with_oauth(
        &self,
        provider: &str,
        options: &OAuthOptions,
    ) -> Result<OAuthRedirect, BoxError>;

    /// Complete an OAuth sign-in: trade the callback `code` and the PKCE verifier for a session.
    fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> impl Future<Output = Result<Session, BoxError>> + Send;

    /// Destroy the current session.
    fn sign_out(&self) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Subscribe to auth-state changes.
    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Remote store of application profiles, keyed by email.
pub trait ProfileStore: Send + Sync + 'static {
    /// Look up the *active* profile for `email`. `Ok(None)` means not found.
    fn find_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<Profile>, BoxError>> + Send;

    /// Insert `profile` unless a row for its email already exists.
    ///
    /// Returns the stored row, or `None` when an existing row was left untouched.
    fn upsert(
        &self,
        profile: Profile,
    ) -> impl Future<Output = Result<Option<Profile>, BoxError>> + Send;
}
