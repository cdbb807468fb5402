//! HTTP client for the storefront REST API.
//!
//! Wraps `reqwest` with bearer-token handling, status-to-error mapping, and
//! typed response deserialization. Tokens live in the shared
//! [`KeyValueStore`] under `access_token` / `refresh_token`. A 401 on an
//! authenticated request triggers exactly one token refresh and one retry;
//! nothing else is retried.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tienda_core::{keys, AppConfig, KeyValueStore};

use crate::error::{mentions_existing_record, parse_field_errors, ApiError};

const DEFAULT_USER_AGENT: &str = "tienda/0.1 (storefront)";

/// Page size used by the "fetch everything" list helpers.
pub(crate) const ALL_PAGE_SIZE: &str = "1000";

/// Client for the storefront REST API.
///
/// Use [`ApiClient::new`] with the loaded configuration, or
/// [`ApiClient::with_base_url`] to point at a mock server in tests.
pub struct ApiClient {
    client: Client,
    base_url: Url,
    store: Arc<dyn KeyValueStore>,
}

impl ApiClient {
    /// Creates a client from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`ApiError::InvalidBaseUrl`] if `api_url` does not
    /// parse.
    pub fn new(config: &AppConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        Self::build(
            &config.api_url,
            config.request_timeout_secs,
            &config.user_agent,
            store,
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`ApiError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ApiError> {
        Self::build(base_url, timeout_secs, DEFAULT_USER_AGENT, store)
    }

    fn build(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Resource paths are joined as segments, so the base must end with
        // exactly one slash.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let invalid = |reason: String| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let base_url = Url::parse(&normalised).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path".to_string()));
        }

        Ok(Self {
            client,
            base_url,
            store,
        })
    }

    /// The store holding this client's tokens.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Builds `<base>/<segments...>/` with each segment percent-encoded.
    pub(crate) fn resource_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `build` rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
            path.push("");
        }
        url
    }

    /// Like [`ApiClient::resource_url`] with query parameters appended.
    pub(crate) fn resource_url_with_query(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.resource_url(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    pub(crate) fn encode_body<T: Serialize + ?Sized>(
        context: &str,
        body: &T,
    ) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(body).map_err(|source| ApiError::Encode {
            context: context.to_string(),
            source,
        })
    }

    /// Sends one request, attaching `token` as a bearer credential if given.
    pub(crate) async fn dispatch(
        &self,
        method: Method,
        url: &Url,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        tracing::debug!(%method, %url, authenticated = token.is_some(), "api request");
        let mut request = self.client.request(method, url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Sends an authenticated request with one refresh-and-retry on 401, and
    /// maps non-2xx statuses to [`ApiError`] variants.
    ///
    /// Requests made without a stored access token go out bare; their 401s
    /// are returned as-is because there is nothing to refresh.
    pub(crate) async fn execute(
        &self,
        method: Method,
        url: &Url,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ApiError> {
        let token = self.store.get(keys::ACCESS_TOKEN)?;
        let response = self
            .dispatch(method.clone(), url, body, token.as_deref())
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED && token.is_some() {
            tracing::info!(%url, "access token rejected, refreshing");
            let access = match self.refresh().await {
                Ok(access) => access,
                Err(e) => {
                    tracing::warn!(error = %e, "token refresh failed, clearing session");
                    self.logout()?;
                    return Err(ApiError::SessionExpired);
                }
            };
            let retried = self.dispatch(method, url, body, Some(&access)).await?;
            return Self::check_status(retried).await;
        }

        Self::check_status(response).await
    }

    /// Convenience wrapper: execute, then decode the JSON body.
    pub(crate) async fn execute_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &Url,
        body: Option<&serde_json::Value>,
    ) -> Result<T, ApiError> {
        let response = self.execute(method, url, body).await?;
        Self::read_json(response, url.as_str()).await
    }

    /// Maps a non-2xx response to the matching [`ApiError`] variant.
    ///
    /// A 400 whose messages report an existing record is a
    /// [`ApiError::Conflict`], the same as a 409.
    pub(crate) async fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();

        match status {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound { url }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized {
                status: status.as_u16(),
            }),
            s if s.is_client_error() => {
                let body = response.text().await.unwrap_or_default();
                let fields = serde_json::from_str::<serde_json::Value>(&body)
                    .map(|v| parse_field_errors(&v))
                    .unwrap_or_default();
                if s == StatusCode::CONFLICT
                    || (s == StatusCode::BAD_REQUEST && mentions_existing_record(&fields))
                {
                    Err(ApiError::Conflict { fields })
                } else {
                    Err(ApiError::Rejected {
                        status: s.as_u16(),
                        fields,
                    })
                }
            }
            s => Err(ApiError::UnexpectedStatus {
                status: s.as_u16(),
                url,
            }),
        }
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(
        response: Response,
        context: &str,
    ) -> Result<T, ApiError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| ApiError::Deserialize {
            context: context.to_string(),
            source,
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
