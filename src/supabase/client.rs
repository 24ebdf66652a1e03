use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::error::Error;
use crate::http::{base_url, ensure_success, join};
use crate::pkce::PkcePair;
use crate::session::{AuthError, OAuthOptions, OAuthRedirect, Session, env_var};
use crate::token;
use crate::types::{Email, Profile, ProviderUserId};

/// Supabase project configuration.
///
/// Required fields are constructor parameters, so there are no runtime "missing field" errors.
///
/// ```rust,ignore
/// let config = SupabaseConfig::new("https://abc.supabase.co".parse()?, anon_key)
///     .with_profile_table("usuarios");
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct SupabaseConfig {
    pub(crate) url: Url,
    pub(crate) anon_key: String,
    pub(crate) profile_table: String,
    pub(crate) timeout: Duration,
}

impl SupabaseConfig {
    #[must_use]
    pub fn new(url: Url, anon_key: impl Into<String>) -> Self {
        Self {
            url: base_url(url),
            anon_key: anon_key.into(),
            profile_table: "usuarios".into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `SUPABASE_URL` (or `VITE_SUPABASE_URL`): project URL
    /// - `SUPABASE_ANON_KEY` (or `VITE_SUPABASE_ANON_KEY`): project anon key
    ///
    /// # Optional env vars
    /// - `PROFILE_TABLE`: profile table name (default `usuarios`)
    /// - `HTTP_TIMEOUT_SECS`: per-request timeout (default 10)
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or values are invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        let url_str = env_var("SUPABASE_URL")
            .or_else(|| env_var("VITE_SUPABASE_URL"))
            .ok_or_else(|| AuthError::Config("SUPABASE_URL is required".into()))?;
        let url: Url = url_str
            .parse()
            .map_err(|e| AuthError::Config(format!("SUPABASE_URL: {e}")))?;
        let anon_key = env_var("SUPABASE_ANON_KEY")
            .or_else(|| env_var("VITE_SUPABASE_ANON_KEY"))
            .ok_or_else(|| AuthError::Config("SUPABASE_ANON_KEY is required".into()))?;

        let mut config = Self::new(url, anon_key);

        if let Some(table) = env_var("PROFILE_TABLE") {
            config = config.with_profile_table(table);
        }
        if let Some(secs) = env_var("HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| AuthError::Config(format!("HTTP_TIMEOUT_SECS: {e}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_profile_table(mut self, table: impl Into<String>) -> Self {
        self.profile_table = table.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn profile_table(&self) -> &str {
        &self.profile_table
    }
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("profile_table", &self.profile_table)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Token response from the GoTrue token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserInfo,
}

/// User record from GoTrue.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Provider-supplied profile hints (Google fills `full_name` and `name`).
#[derive(Debug, Clone, Default, Deserialize)]
#[non_exhaustive]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl TokenResponse {
    /// Build a [`Session`], taking email and expiry from the token when the body omits them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] if no email can be found, or [`Error::InvalidEmail`].
    pub fn into_session(self) -> Result<Session, Error> {
        let claims = token::decode_unverified(&self.access_token).ok();

        let email = self
            .user
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .or_else(|| claims.as_ref().and_then(|c| c.email.clone()))
            .ok_or_else(|| Error::Token("session has no email".into()))?;
        let email: Email = email.parse()?;

        let expires_at = self
            .expires_at
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
            .or_else(|| claims.as_ref().and_then(token::AccessClaims::expires_at));

        let mut session = Session::new(self.access_token, ProviderUserId(self.user.id), email);
        if let Some(refresh) = self.refresh_token {
            session = session.with_refresh_token(refresh);
        }
        if let Some(at) = expires_at {
            session = session.with_expires_at(at);
        }
        if let Some(name) = self.user.user_metadata.full_name.or(self.user.user_metadata.name) {
            session = session.with_display_name(name);
        }
        Ok(session)
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct PkceGrant<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// HTTP client for a Supabase project's auth (GoTrue) and REST (PostgREST) APIs.
pub struct SupabaseClient {
    config: SupabaseConfig,
    http: reqwest::Client,
}

impl SupabaseClient {
    /// Create a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be initialized.
    pub fn new(config: SupabaseConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn auth_url(&self, path: &str) -> Result<Url, Error> {
        join(&self.config.url, &format!("auth/v1/{path}"))
    }

    fn token_url(&self, grant_type: &str) -> Result<Url, Error> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }

    pub(crate) fn profiles_url(&self) -> Result<Url, Error> {
        join(
            &self.config.url,
            &format!("rest/v1/{}", self.config.profile_table),
        )
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header("apikey", &self.config.anon_key)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Api`] if the credentials are rejected.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, Error> {
        let response = self
            .with_key(self.http.post(self.token_url("password")?))
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        let response = ensure_success(response, "password sign-in").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Build the authorize URL for an OAuth sign-in with a fresh PKCE pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the authorize URL cannot be built from the project URL.
    pub fn authorization_url(
        &self,
        provider: &str,
        options: &OAuthOptions,
    ) -> Result<OAuthRedirect, Error> {
        let pkce = PkcePair::generate();
        let mut url = self.auth_url("authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("provider", provider)
                .append_pair("redirect_to", options.redirect_to.as_str());
            if !options.scopes.is_empty() {
                query.append_pair("scopes", &options.scopes.join(" "));
            }
            query
                .append_pair("code_challenge", &pkce.challenge)
                .append_pair("code_challenge_method", "s256");
            for (key, value) in &options.query_params {
                query.append_pair(key, value);
            }
        }

        Ok(OAuthRedirect::new(url, pkce.verifier))
    }

    /// Exchange an OAuth callback code for a session using PKCE.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Api`] if the token endpoint rejects the code.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, Error> {
        let response = self
            .with_key(self.http.post(self.token_url("pkce")?))
            .json(&PkceGrant {
                auth_code: code,
                code_verifier,
            })
            .send()
            .await?;

        let response = ensure_success(response, "code exchange").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Trade a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Api`] if the refresh token is rejected.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        let response = self
            .with_key(self.http.post(self.token_url("refresh_token")?))
            .json(&RefreshGrant { refresh_token })
            .send()
            .await?;

        let response = ensure_success(response, "token refresh").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Fetch the user an access token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Api`] if the token is not accepted.
    pub async fn get_user(&self, access_token: &str) -> Result<UserInfo, Error> {
        let response = self
            .with_key(self.http.get(self.auth_url("user")?))
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = ensure_success(response, "user request").await?;
        response.json::<UserInfo>().await.map_err(Into::into)
    }

    /// Revoke the session an access token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Api`] if the logout endpoint returns an error.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), Error> {
        let response = self
            .with_key(self.http.post(self.auth_url("logout")?))
            .bearer_auth(access_token)
            .send()
            .await?;

        ensure_success(response, "sign-out").await?;
        Ok(())
    }

    /// Active profile row for `email`, or `None` if there is none.
    ///
    /// Without an access token the request runs with the anon key's privileges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on a PostgREST error.
    pub async fn select_profile(
        &self,
        access_token: Option<&str>,
        email: &Email,
    ) -> Result<Option<Profile>, Error> {
        let mut url = self.profiles_url()?;
        url.query_pairs_mut()
            .append_pair("select", "email,nombre,rol,activo")
            .append_pair("email", &format!("eq.{email}"))
            .append_pair("activo", "eq.true")
            .append_pair("limit", "1");

        let response = self
            .with_key(self.http.get(url))
            .bearer_auth(access_token.unwrap_or(self.config.anon_key.as_str()))
            .send()
            .await?;

        let response = ensure_success(response, "profile lookup").await?;
        let rows = response.json::<Vec<Profile>>().await?;
        Ok(rows.into_iter().next())
    }

    /// Insert `profile` unless its email already has a row; returns the inserted row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on a PostgREST error.
    pub async fn insert_profile(
        &self,
        access_token: Option<&str>,
        profile: &Profile,
    ) -> Result<Option<Profile>, Error> {
        let mut url = self.profiles_url()?;
        url.query_pairs_mut().append_pair("on_conflict", "email");

        let response = self
            .with_key(self.http.post(url))
            .bearer_auth(access_token.unwrap_or(self.config.anon_key.as_str()))
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(&[profile])
            .send()
            .await?;

        let response = ensure_success(response, "profile provisioning").await?;
        let rows = response.json::<Vec<Profile>>().await?;
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::token::encode_for_test;

    fn test_config() -> SupabaseConfig {
        SupabaseConfig::new("https://abc.supabase.co".parse().unwrap(), "anon-key")
    }

    fn test_client() -> SupabaseClient {
        SupabaseClient::new(test_config()).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = test_config();
        assert_eq!(config.url().as_str(), "https://abc.supabase.co/");
        assert_eq!(config.profile_table(), "usuarios");
        assert!(!format!("{config:?}").contains("anon-key"));
    }

    #[test]
    fn test_endpoint_urls() {
        let client = test_client();
        assert_eq!(
            client.token_url("password").unwrap().as_str(),
            "https://abc.supabase.co/auth/v1/token?grant_type=password"
        );
        assert_eq!(
            client.profiles_url().unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/usuarios"
        );
    }

    #[test]
    fn test_authorization_url_contains_pkce() {
        let client = test_client();
        let options = OAuthOptions::new("https://app.school.edu/auth/callback".parse().unwrap())
            .with_query_param("hd", "school.edu");

        let redirect = client.authorization_url("google", &options).unwrap();

        assert!(redirect.url.starts_with("https://abc.supabase.co/auth/v1/authorize?"));
        assert!(redirect.url.contains("provider=google"));
        assert!(redirect.url.contains("code_challenge_method=s256"));
        assert!(redirect.url.contains("hd=school.edu"));
        assert!(redirect.url.contains(&format!(
            "code_challenge={}",
            crate::pkce::generate_code_challenge(&redirect.code_verifier)
        )));
        assert!(!redirect.url.contains(&redirect.code_verifier));
    }

    #[test]
    fn test_authorization_url_unique_per_call() {
        let client = test_client();
        let options = OAuthOptions::new("https://app.school.edu/auth/callback".parse().unwrap());
        let first = client.authorization_url("google", &options).unwrap();
        let second = client.authorization_url("google", &options).unwrap();
        assert_ne!(first.code_verifier, second.code_verifier);
    }

    #[test]
    fn test_token_response_into_session() {
        let body = json!({
            "access_token": "header.payload.sig",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1_900_000_000,
            "refresh_token": "r-123",
            "user": {
                "id": "8d0f",
                "email": "Ana@School.edu",
                "user_metadata": { "full_name": "Ana López" }
            }
        });
        let response: TokenResponse = serde_json::from_value(body).unwrap();

        let session = response.into_session().unwrap();

        assert_eq!(session.email.as_str(), "Ana@school.edu");
        assert_eq!(session.user_id.to_string(), "8d0f");
        assert_eq!(session.refresh_token.as_deref(), Some("r-123"));
        assert_eq!(session.display_name.as_deref(), Some("Ana López"));
        assert_eq!(
            session.expires_at.map(OffsetDateTime::unix_timestamp),
            Some(1_900_000_000)
        );
    }

    #[test]
    fn test_token_response_falls_back_to_claims() {
        let access_token = encode_for_test(&json!({
            "sub": "8d0f",
            "email": "ana@school.edu",
            "exp": 1_800_000_000,
        }));
        let body = json!({
            "access_token": access_token,
            "user": { "id": "8d0f", "email": "" }
        });
        let response: TokenResponse = serde_json::from_value(body).unwrap();

        let session = response.into_session().unwrap();

        assert_eq!(session.email.as_str(), "ana@school.edu");
        assert_eq!(
            session.expires_at.map(OffsetDateTime::unix_timestamp),
            Some(1_800_000_000)
        );
    }

    #[test]
    fn test_token_response_without_email() {
        let body = json!({
            "access_token": "opaque",
            "user": { "id": "8d0f" }
        });
        let response: TokenResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(response.into_session(), Err(Error::Token(_))));
    }
}
