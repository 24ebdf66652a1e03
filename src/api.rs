//! Client for the guard-duty REST backend.
//!
//! Thin over `reqwest`: callers pick a path from [`paths`] and the payload
//! type. A 401 is logged and surfaced; there are no retries.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Error;
use crate::http::{base_url, ensure_success, join};
use crate::session::{AuthError, env_var};

const DEFAULT_API_URL: &str = "http://localhost:8081";

/// Path builders for the backend's endpoints. Free-text segments are percent-encoded.
pub mod paths {
    use urlencoding::encode;

    pub const HEALTH: &str = "/health";
    pub const ABSENCES: &str = "/api/ausencias";
    pub const ABSENCES_BATCH: &str = "/api/ausencias/multiple";
    pub const ABSENCE_HISTORY: &str = "/api/ausencias/historico";
    pub const TEACHERS: &str = "/api/profesores";
    pub const EQUITY_DASHBOARD: &str = "/api/estadisticas/dashboard-equidad";
    pub const IMBALANCE_REPORT: &str = "/api/estadisticas/reporte-desbalance";

    #[must_use]
    pub fn absence(id: i64) -> String {
        format!("/api/ausencias/{id}")
    }

    #[must_use]
    pub fn absences_by_teacher(email: &str) -> String {
        format!("/api/ausencias/por-profesor/{}", encode(email))
    }

    #[must_use]
    pub fn absences_by_date(date: &str) -> String {
        format!("/api/ausencias/por-fecha?fecha={}", encode(date))
    }

    #[must_use]
    pub fn coverages_by_teacher(email: &str) -> String {
        format!("/api/coberturas/profesor/{}", encode(email))
    }

    #[must_use]
    pub fn coverage_by_absence(absence_id: i64) -> String {
        format!("/api/coberturas/ausencia/{absence_id}")
    }

    #[must_use]
    pub fn coverage_on_date(absence_id: i64, date: &str) -> String {
        format!("/api/coberturas/ausencia/{absence_id}/fecha/{}", encode(date))
    }

    #[must_use]
    pub fn assign_coverage(absence_id: i64, teacher_email: &str) -> String {
        format!(
            "/api/coberturas/asignarCobertura/{absence_id}/{}",
            encode(teacher_email)
        )
    }

    #[must_use]
    pub fn teacher(id: i64) -> String {
        format!("/api/profesores/{id}")
    }

    #[must_use]
    pub fn teacher_by_email(email: &str) -> String {
        format!("/api/profesores/email/{}", encode(email))
    }

    #[must_use]
    pub fn schedule_by_email(email: &str) -> String {
        format!("/api/horarios/horario/profesor/email?email={}", encode(email))
    }

    #[must_use]
    pub fn schedule_for_day(teacher_id: i64, weekday: &str) -> String {
        format!(
            "/api/horarios/horario/profesor/{teacher_id}/dia/{}",
            encode(weekday)
        )
    }

    #[must_use]
    pub fn duty_slot(weekday: &str, hour: &str) -> String {
        format!(
            "/api/horarios/horario/guardia/dia/{}/hora/{}",
            encode(weekday),
            encode(hour)
        )
    }

    #[must_use]
    pub fn teacher_counters(email: &str) -> String {
        format!("/api/estadisticas/profesor/{}/contadores", encode(email))
    }
}

/// HTTP client for the backend.
///
/// ```rust,ignore
/// let api = ApiClient::from_env()?.with_access_token(session.access_token.clone());
/// let mine: serde_json::Value = api.get_json(&paths::absences_by_teacher("ana@school.edu")).await?;
/// ```
#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    access_token: Option<String>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be initialized.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base: base_url(base),
            http,
            access_token: None,
        })
    }

    /// Create a client from `API_URL` (default `http://localhost:8081`) and `HTTP_TIMEOUT_SECS` (default 10).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if a value is invalid or the client cannot be built.
    pub fn from_env() -> Result<Self, AuthError> {
        let url = env_var("API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let base: Url = url
            .parse()
            .map_err(|e| AuthError::Config(format!("API_URL: {e}")))?;
        let secs = match env_var("HTTP_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse()
                .map_err(|e| AuthError::Config(format!("HTTP_TIMEOUT_SECS: {e}")))?,
            None => 10,
        };
        Self::new(base, Duration::from_secs(secs)).map_err(|e| AuthError::Config(e.to_string()))
    }

    /// Send `token` as a bearer credential on every request.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder, Error> {
        let url = join(&self.base, path)?;
        let request = self.http.request(method, url);
        Ok(match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
        path: &str,
    ) -> Result<reqwest::Response, Error> {
        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!(path, "backend rejected credentials");
        }
        ensure_success(response, operation).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`] on network or decode failure, or [`Error::Api`] on a non-2xx status.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let request = self.request(reqwest::Method::GET, path)?;
        let response = self.send(request, "GET", path).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`] on network or decode failure, or [`Error::Api`] on a non-2xx status.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let request = self.request(reqwest::Method::POST, path)?.json(body);
        let response = self.send(request, "POST", path).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on a non-2xx status.
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        let request = self.request(reqwest::Method::DELETE, path)?;
        self.send(request, "DELETE", path).await?;
        Ok(())
    }

    /// Whether the backend answers its health endpoint.
    pub async fn is_healthy(&self) -> bool {
        match self.request(reqwest::Method::GET, paths::HEALTH) {
            Ok(request) => match self.send(request, "GET", paths::HEALTH).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(error = %e, "health check failed");
                    false
                }
            },
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .field("authenticated", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_encode_emails() {
        assert_eq!(
            paths::absences_by_teacher("ana.lópez@school.edu"),
            "/api/ausencias/por-profesor/ana.l%C3%B3pez%40school.edu"
        );
        assert_eq!(
            paths::assign_coverage(7, "luis@school.edu"),
            "/api/coberturas/asignarCobertura/7/luis%40school.edu"
        );
        assert_eq!(
            paths::schedule_by_email("ana+x@school.edu"),
            "/api/horarios/horario/profesor/email?email=ana%2Bx%40school.edu"
        );
    }

    #[test]
    fn test_paths_numeric_segments() {
        assert_eq!(paths::absence(42), "/api/ausencias/42");
        assert_eq!(
            paths::coverage_on_date(3, "2024-03-11"),
            "/api/coberturas/ausencia/3/fecha/2024-03-11"
        );
        assert_eq!(
            paths::duty_slot("LUNES", "3"),
            "/api/horarios/horario/guardia/dia/LUNES/hora/3"
        );
    }

    #[test]
    fn test_request_url_and_auth() {
        let api = ApiClient::new(
            "http://localhost:8081".parse().unwrap(),
            Duration::from_secs(10),
        )
        .unwrap()
        .with_access_token("secret");

        let request = api
            .request(reqwest::Method::GET, &paths::absences_by_date("2024-03-11"))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "http://localhost:8081/api/ausencias/por-fecha?fecha=2024-03-11"
        );
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer secret"
        );
        assert!(!format!("{api:?}").contains("secret"));
    }
}
