use time::OffsetDateTime;
use url::Url;

use crate::types::{Email, Profile, ProviderUserId, Role};

/// Session issued by the auth provider after a successful sign-in.
///
/// The application holds a read-only view; creating and destroying sessions is
/// the provider's job. `Debug` never prints tokens.
#[derive(Clone)]
#[non_exhaustive]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
    pub user_id: ProviderUserId,
    pub email: Email,
    /// Display name from the provider's user metadata (e.g. Google `full_name`).
    pub display_name: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new(access_token: impl Into<String>, user_id: ProviderUserId, email: Email) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            user_id,
            email,
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_expires_at(mut self, at: OffsetDateTime) -> Self {
        self.expires_at = Some(at);
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Whether the access token has expired at `now`. Sessions without a known expiry never do.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Who the caller is, once a session has been matched to a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: Email,
    pub display_name: String,
    pub role: Role,
}

impl From<&Profile> for Identity {
    fn from(profile: &Profile) -> Self {
        Self {
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            role: profile.role,
        }
    }
}

/// Outcome of one session resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl SessionState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Anonymous => None,
        }
    }

    #[must_use]
    pub fn email(&self) -> Option<&Email> {
        self.identity().map(|i| &i.email)
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.identity().map(|i| i.role)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role().is_some_and(Role::is_admin)
    }

    /// Authenticated and holding at least `required`.
    #[must_use]
    pub fn has_permission(&self, required: Role) -> bool {
        self.role().is_some_and(|role| role.satisfies(required))
    }
}

/// Auth-state transitions broadcast by an [`AuthProvider`](super::AuthProvider).
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

/// Options for starting an OAuth sign-in.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthOptions {
    pub redirect_to: Url,
    pub scopes: Vec<String>,
    /// Extra authorize-URL parameters, e.g. `("hd", "school.edu")` to hint Google's account chooser.
    pub query_params: Vec<(String, String)>,
}

impl OAuthOptions {
    #[must_use]
    pub fn new(redirect_to: Url) -> Self {
        Self {
            redirect_to,
            scopes: Vec::new(),
            query_params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }
}

/// Where to send the browser to start OAuth, plus the PKCE verifier to keep for the callback.
#[non_exhaustive]
pub struct OAuthRedirect {
    pub url: String,
    pub code_verifier: String,
}

impl OAuthRedirect {
    #[must_use]
    pub fn new(url: impl Into<String>, code_verifier: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            code_verifier: code_verifier.into(),
        }
    }
}

impl std::fmt::Debug for OAuthRedirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthRedirect")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            email: "ana@school.edu".parse().unwrap(),
            display_name: "Ana".into(),
            role,
        }
    }

    #[test]
    fn anonymous_has_no_role() {
        let state = SessionState::Anonymous;
        assert!(!state.is_authenticated());
        assert_eq!(state.role(), None);
        assert!(!state.has_permission(Role::User));
    }

    #[test]
    fn authenticated_permissions() {
        let user = SessionState::Authenticated(identity(Role::User));
        assert!(user.has_permission(Role::User));
        assert!(!user.has_permission(Role::Admin));
        assert!(!user.is_admin());

        let admin = SessionState::Authenticated(identity(Role::Admin));
        assert!(admin.has_permission(Role::User));
        assert!(admin.is_admin());
    }

    #[test]
    fn session_debug_hides_tokens() {
        let session = Session::new(
            "secret-access",
            ProviderUserId("u1".into()),
            "ana@school.edu".parse().unwrap(),
        )
        .with_refresh_token("secret-refresh");
        let printed = format!("{session:?}");
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
        assert!(printed.contains("ana@school.edu"));
    }

    #[test]
    fn session_expiry() {
        let at = OffsetDateTime::from_unix_timestamp(1_000).unwrap();
        let session = Session::new(
            "t",
            ProviderUserId("u1".into()),
            "ana@school.edu".parse().unwrap(),
        );
        assert!(!session.is_expired_at(at));
        let session = session.with_expires_at(at);
        assert!(session.is_expired_at(at));
        assert!(!session.is_expired_at(at - time::Duration::seconds(1)));
    }
}
