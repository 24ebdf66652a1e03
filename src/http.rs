use url::Url;

use crate::error::Error;

/// Base URL whose path ends in `/`, so relative joins append instead of replacing the last segment.
pub(crate) fn base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Join `path` (with or without a leading `/`) onto a [`base_url`].
pub(crate) fn join(base: &Url, path: &str) -> Result<Url, Error> {
    base.join(path.trim_start_matches('/')).map_err(|e| Error::Api {
        operation: "url",
        status: None,
        detail: format!("{path}: {e}"),
    })
}

/// Checks HTTP response status; returns the response on success or an error with details.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api {
        operation,
        status: Some(status),
        detail: body,
    })
}
