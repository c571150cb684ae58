//! Login via Discord's OAuth2 authorization code flow
//!
//! The client is redirected to Discord's authorization page ([DiscordIdentityProvider::authorization_url]),
//! which redirects back to our callback endpoint with an authorization code. The code is exchanged
//! for an access token, which is then used to fetch the user's Discord identity.

use crate::data_store::models::ExternalIdentity;
use crate::setup::DiscordSettings;
use log::error;
use serde::Deserialize;
use std::fmt::{Display, Formatter};

const AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
const TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
const USER_URL: &str = "https://discord.com/api/users/@me";

pub struct DiscordIdentityProvider {
    settings: DiscordSettings,
    http_client: reqwest::Client,
}

impl DiscordIdentityProvider {
    pub fn new(settings: DiscordSettings) -> Self {
        Self {
            settings,
            http_client: reqwest::Client::new(),
        }
    }

    /// URL of Discord's authorization page, to which the client shall be redirected for logging in
    pub fn authorization_url(&self, state: &str) -> Result<url::Url, IdentityProviderError> {
        let query = serde_urlencoded::to_string([
            ("client_id", self.settings.client_id.as_str()),
            ("redirect_uri", self.settings.callback_url.as_str()),
            ("response_type", "code"),
            ("scope", "identify"),
            ("state", state),
        ])
        .map_err(|e| IdentityProviderError::InvalidConfiguration(e.to_string()))?;
        format!("{}?{}", AUTHORIZE_URL, query)
            .parse()
            .map_err(|e: url::ParseError| IdentityProviderError::InvalidConfiguration(e.to_string()))
    }

    /// Exchange the authorization code from the callback request for the user's identity
    pub async fn identify(&self, code: &str) -> Result<ExternalIdentity, IdentityProviderError> {
        let access_token = self.exchange_code(code).await?;
        self.fetch_identity(&access_token).await
    }

    async fn exchange_code(&self, code: &str) -> Result<String, IdentityProviderError> {
        let params = [
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.callback_url.as_str()),
        ];
        let response = self
            .http_client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| IdentityProviderError::TokenExchangeFailed(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!("Discord token exchange failed with {}: {}", status, error_body);
            return Err(IdentityProviderError::TokenExchangeFailed(format!(
                "HTTP status {}",
                status
            )));
        }
        let token_response: DiscordTokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityProviderError::TokenExchangeFailed(e.to_string()))?;
        Ok(token_response.access_token)
    }

    async fn fetch_identity(
        &self,
        access_token: &str,
    ) -> Result<ExternalIdentity, IdentityProviderError> {
        let response = self
            .http_client
            .get(USER_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdentityProviderError::UserInfoFailed(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!("Discord user request failed with {}: {}", status, error_body);
            return Err(IdentityProviderError::UserInfoFailed(format!(
                "HTTP status {}",
                status
            )));
        }
        let user: DiscordUser = response
            .json()
            .await
            .map_err(|e| IdentityProviderError::UserInfoFailed(e.to_string()))?;
        Ok(user.into())
    }
}

#[derive(Deserialize)]
struct DiscordTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
    global_name: Option<String>,
    avatar: Option<String>,
}

impl From<DiscordUser> for ExternalIdentity {
    fn from(value: DiscordUser) -> Self {
        Self {
            external_id: value.id,
            display_name: value.global_name.unwrap_or(value.username),
            avatar_ref: value.avatar,
        }
    }
}

#[derive(Debug)]
pub enum IdentityProviderError {
    InvalidConfiguration(String),
    TokenExchangeFailed(String),
    UserInfoFailed(String),
}

impl Display for IdentityProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfiguration(e) => write!(f, "Invalid OAuth2 configuration: {}", e),
            Self::TokenExchangeFailed(e) => write!(f, "OAuth2 token exchange failed: {}", e),
            Self::UserInfoFailed(e) => write!(f, "Fetching the user identity failed: {}", e),
        }
    }
}

impl std::error::Error for IdentityProviderError {}
