use super::traits::BoxError;

/// Errors from session resolution and the login flows.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No valid session found.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Sign-in attempted with a malformed email address.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Email domain is not in the allowed set. The session has been signed out.
    #[error("Email domain not allowed: {email}")]
    DomainNotAllowed { email: String },

    /// No profile exists for the session email and provisioning is disabled.
    #[error("No profile for {email}")]
    ProfileNotFound { email: String },

    /// A profile row exists for the email but is not active.
    #[error("Profile for {email} is inactive")]
    ProfileInactive { email: String },

    /// Auth provider call failed (network, rejected credentials, malformed response).
    #[error("Auth provider error: {0}")]
    Provider(String),

    /// Profile store call failed for a reason other than "not found".
    #[error("Profile store error: {0}")]
    ProfileStore(String),

    /// The requested sign-in method is not the configured one.
    #[error("{0} sign-in is disabled")]
    ModeDisabled(&'static str),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    pub(crate) fn provider(e: BoxError) -> Self {
        Self::Provider(e.to_string())
    }

    pub(crate) fn store(e: BoxError) -> Self {
        Self::ProfileStore(e.to_string())
    }
}

impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        Self::Provider(e.to_string())
    }
}
