use std::time::Duration;

use url::Url;

use super::error::AuthError;

/// Which sign-in method the deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Password,
    OAuth,
}

impl std::str::FromStr for AuthMode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "password" => Ok(Self::Password),
            "oauth" => Ok(Self::OAuth),
            other => Err(AuthError::Config(format!(
                "AUTH_MODE: unknown mode '{other}' (expected password or oauth)"
            ))),
        }
    }
}

/// Paths the guard redirects to.
#[derive(Debug, Clone)]
pub(crate) struct RouteSettings {
    pub(crate) login_path: String,
    pub(crate) home_path: String,
    pub(crate) callback_path: String,
    pub(crate) admin_landing: Option<String>,
}

impl RouteSettings {
    fn defaults() -> Self {
        Self {
            login_path: "/login".into(),
            home_path: "/".into(),
            callback_path: "/auth/callback".into(),
            admin_landing: Some("/admin".into()),
        }
    }
}

/// Session and login policy.
///
/// All fields have defaults; override with `with_*` methods, or use
/// [`from_env()`](AuthConfig::from_env) for convention-based setup.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub(crate) mode: AuthMode,
    pub(crate) allowed_domains: Vec<String>,
    pub(crate) oauth_provider: String,
    pub(crate) oauth_redirect: Option<Url>,
    pub(crate) oauth_scopes: Vec<String>,
    pub(crate) auto_provision: bool,
    pub(crate) cache_ttl: Option<Duration>,
    pub(crate) routes: RouteSettings,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(AuthMode::Password)
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            allowed_domains: Vec::new(),
            oauth_provider: "google".into(),
            oauth_redirect: None,
            oauth_scopes: Vec::new(),
            auto_provision: true,
            cache_ttl: Some(Duration::from_secs(300)),
            routes: RouteSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `AUTH_MODE`: `password` (default) or `oauth`
    /// - `ALLOWED_EMAIL_DOMAINS`: comma-separated domains; unset means unrestricted
    /// - `OAUTH_PROVIDER`: OAuth provider name (default `google`)
    /// - `OAUTH_REDIRECT_URL`: OAuth callback URL, required when `AUTH_MODE=oauth`
    /// - `OAUTH_SCOPES`: comma-separated extra scopes
    /// - `AUTO_PROVISION`: `false`/`0`/`no`/`off` disables first-login profile creation
    /// - `PROFILE_CACHE_TTL_SECS`: profile cache TTL, `0` disables expiry (default 300)
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if a value does not parse or oauth mode lacks a redirect URL.
    pub fn from_env() -> Result<Self, AuthError> {
        let mode = match env_var("AUTH_MODE") {
            Some(m) => m.parse()?,
            None => AuthMode::default(),
        };

        let mut config = Self::new(mode);

        if let Some(domains) = env_var("ALLOWED_EMAIL_DOMAINS") {
            config = config.with_allowed_domains(split_list(&domains));
        }
        if let Some(provider) = env_var("OAUTH_PROVIDER") {
            config = config.with_oauth_provider(provider);
        }
        if let Some(url_str) = env_var("OAUTH_REDIRECT_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("OAUTH_REDIRECT_URL: {e}")))?;
            config = config.with_oauth_redirect(url);
        }
        if let Some(scopes) = env_var("OAUTH_SCOPES") {
            config = config.with_oauth_scopes(split_list(&scopes));
        }
        if let Some(flag) = env_var("AUTO_PROVISION") {
            config = config.with_auto_provision(parse_flag("AUTO_PROVISION", &flag)?);
        }
        if let Some(secs) = env_var("PROFILE_CACHE_TTL_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| AuthError::Config(format!("PROFILE_CACHE_TTL_SECS: {e}")))?;
            config = config.with_cache_ttl((secs > 0).then(|| Duration::from_secs(secs)));
        }

        if config.mode == AuthMode::OAuth && config.oauth_redirect.is_none() {
            return Err(AuthError::Config(
                "OAUTH_REDIRECT_URL is required when AUTH_MODE=oauth".into(),
            ));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = domains;
        self
    }

    #[must_use]
    pub fn with_oauth_provider(mut self, provider: impl Into<String>) -> Self {
        self.oauth_provider = provider.into();
        self
    }

    #[must_use]
    pub fn with_oauth_redirect(mut self, url: Url) -> Self {
        self.oauth_redirect = Some(url);
        self
    }

    #[must_use]
    pub fn with_oauth_scopes(mut self, scopes: Vec<String>) -> Self {
        self.oauth_scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_auto_provision(mut self, enabled: bool) -> Self {
        self.auto_provision = enabled;
        self
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.routes.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_home_path(mut self, path: impl Into<String>) -> Self {
        self.routes.home_path = path.into();
        self
    }

    #[must_use]
    pub fn with_callback_path(mut self, path: impl Into<String>) -> Self {
        self.routes.callback_path = path.into();
        self
    }

    /// Where an admin landing on the login page is sent (`None`: the home path).
    #[must_use]
    pub fn with_admin_landing(mut self, path: Option<String>) -> Self {
        self.routes.admin_landing = path;
        self
    }

    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    #[must_use]
    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }
}

/// Non-empty environment variable.
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Boolean setting; anything other than a recognised spelling is an error.
fn parse_flag(name: &str, value: &str) -> Result<bool, AuthError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AuthError::Config(format!(
            "{name}: expected true or false, got '{other}'"
        ))),
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}
