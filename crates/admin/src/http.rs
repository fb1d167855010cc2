//! HTTP client for the backend REST API.
//!
//! Every request goes through one pipeline: the bearer token from the
//! [`SessionStore`] is attached when there is one, and an HTTP 401 response
//! clears the session (and requests the login view) before the error
//! reaches the caller.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{ApiError, BackendErrorBody};
use crate::session::SessionStore;

/// Ordered query-string pairs.
pub type QueryPairs = Vec<(String, String)>;

/// Backend REST client.
///
/// Cheap to clone; clones share the connection pool and the session.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    session: SessionStore,
}

impl ApiClient {
    /// Create a client for `config`, reading tokens from `session`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                session,
            }),
        })
    }

    /// The session this client authenticates with.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Base URL every path is appended to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build the full URL for `path` plus `query`.
    ///
    /// Each element of `path` is one percent-encoded segment, so `/`, `?`
    /// and `#` inside an identifier stay part of it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if the base URL cannot take path
    /// segments.
    pub fn url(&self, path: &[&str], query: &[(String, String)]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(path);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    /// `GET path?query`, decoding the JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, query))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        let url = self.url(path, query)?;
        let body = self.send(Method::GET, url, None::<&()>).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `POST path` with a JSON body, decoding the JSON response.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, body))]
    pub async fn post<B, T>(&self, path: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, &[])?;
        let body = self.send(Method::POST, url, Some(body)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `PUT path` with a JSON body, decoding the JSON response.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, body))]
    pub async fn put<B, T>(&self, path: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, &[])?;
        let body = self.send(Method::PUT, url, Some(body)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `DELETE path`. Returns `None` when the backend answers without a body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self))]
    pub async fn delete(&self, path: &[&str]) -> Result<Option<Value>, ApiError> {
        let url = self.url(path, &[])?;
        let body = self.send(Method::DELETE, url, None::<&()>).await?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&body)?))
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError> {
        tracing::debug!(%method, %url, "Sending backend request");

        let mut request = self.inner.client.request(method, url);
        if let Some(token) = self.inner.session.token() {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Backend rejected the session token, logging out");
            self.inner.session.logout_unauthorized();
            return Err(ApiError::Unauthorized(BackendErrorBody::parse(&body)));
        }

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Backend returned an error");
            return Err(ApiError::Backend {
                status: status.as_u16(),
                error: BackendErrorBody::parse(&body),
            });
        }

        Ok(body)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig::new(base).unwrap(), SessionStore::in_memory()).unwrap()
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let api = client("http://localhost:1337/api");
        assert_eq!(
            api.url(&["customers", "abc"], &[]).unwrap().as_str(),
            "http://localhost:1337/api/customers/abc"
        );

        let api = client("http://localhost:1337/api/");
        assert_eq!(
            api.url(&["units"], &[]).unwrap().as_str(),
            "http://localhost:1337/api/units"
        );
    }

    #[test]
    fn test_url_encodes_path_segments() {
        let api = client("http://localhost:1337/api");
        assert_eq!(
            api.url(&["customers", "a/b?c#d"], &[]).unwrap().as_str(),
            "http://localhost:1337/api/customers/a%2Fb%3Fc%23d"
        );
        assert_eq!(
            api.url(&["units", "ชิ้น 1"], &[]).unwrap().path(),
            "/api/units/%E0%B8%8A%E0%B8%B4%E0%B9%89%E0%B8%99%201"
        );
    }

    #[test]
    fn test_url_encodes_query_pairs() {
        let api = client("http://localhost:1337/api");
        let query = vec![
            ("pagination[page]".to_string(), "1".to_string()),
            ("filters[name][$containsi]".to_string(), "สมชาย".to_string()),
        ];
        let url = api.url(&["customers"], &query).unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs, query);
    }

    #[test]
    fn test_url_without_query_has_no_question_mark() {
        let api = client("http://localhost:1337/api");
        assert!(api.url(&["customers"], &[]).unwrap().query().is_none());
    }

    #[test]
    fn test_debug_output() {
        let api = client("http://localhost:1337/api");
        assert!(format!("{api:?}").contains("localhost:1337"));
    }
}
