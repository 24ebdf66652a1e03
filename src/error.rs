#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{operation} failed (status {status:?}): {detail}")]
    Api {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[cfg(any(feature = "supabase", feature = "api"))]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token decode error: {0}")]
    Token(String),
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

impl Error {
    /// HTTP status reported by the remote service, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            #[cfg(any(feature = "supabase", feature = "api"))]
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
