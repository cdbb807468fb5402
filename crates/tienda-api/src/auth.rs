//! Token issue, refresh, and logout.
//!
//! Token endpoints are always called without a bearer header.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tienda_core::keys;

use crate::client::ApiClient;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

impl ApiClient {
    /// Exchanges credentials for a token pair and stores both tokens.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Unauthorized`] if the credentials are refused.
    /// - [`ApiError::Http`] on network failure.
    /// - [`ApiError::Deserialize`] if the response shape is unexpected.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let url = self.resource_url(&["token"]);
        let body = Self::encode_body("token", &Credentials { username, password })?;
        let response = self.dispatch(Method::POST, &url, Some(&body), None).await?;
        let response = Self::check_status(response).await?;
        let tokens: TokenPair = Self::read_json(response, "token").await?;

        self.store().set(keys::ACCESS_TOKEN, &tokens.access)?;
        self.store().set(keys::REFRESH_TOKEN, &tokens.refresh)?;
        tracing::info!(username, "logged in");
        Ok(tokens)
    }

    /// Obtains a fresh access token using the stored refresh token.
    ///
    /// # Errors
    ///
    /// - [`ApiError::SessionExpired`] if no refresh token is stored.
    /// - [`ApiError::Unauthorized`] if the refresh token is refused.
    /// - [`ApiError::Http`] on network failure.
    pub async fn refresh(&self) -> Result<String, ApiError> {
        let Some(refresh) = self.store().get(keys::REFRESH_TOKEN)? else {
            return Err(ApiError::SessionExpired);
        };
        let url = self.resource_url(&["token", "refresh"]);
        let body = serde_json::json!({ "refresh": refresh });
        let response = self.dispatch(Method::POST, &url, Some(&body), None).await?;
        let response = Self::check_status(response).await?;
        let RefreshResponse { access } = Self::read_json(response, "token/refresh").await?;

        self.store().set(keys::ACCESS_TOKEN, &access)?;
        Ok(access)
    }

    /// Forgets both tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the token store cannot be written.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.store().remove(keys::ACCESS_TOKEN)?;
        self.store().remove(keys::REFRESH_TOKEN)?;
        Ok(())
    }

    /// Whether an access token is currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the token store cannot be read.
    pub fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self.store().get(keys::ACCESS_TOKEN)?.is_some())
    }
}
