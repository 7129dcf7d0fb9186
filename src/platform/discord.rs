//! Usage: reqwest-backed Discord implementation of `PlatformApi`.

use super::api::{PlatformApi, PlatformFuture, UserIdentity};
use crate::domain::entitlements::EntitlementFlags;
use crate::infra::settings::AppSettings;
use crate::oauth::token_exchange::{
    exchange_authorization_code, refresh_access_token, OAuthTokenSet, TokenExchangeRequest,
    TokenRefreshRequest,
};
use crate::shared::error::{AppError, AppResult};
use crate::shared::security::sanitize_error_body_snippet;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shared outbound client; every call is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("linked-role-gate/{}", env!("CARGO_PKG_VERSION")))
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(|e| {
            AppError::new("SYSTEM_ERROR", format!("http client init failed: {e}")).with_source(e)
        })
}

#[derive(Debug, Clone)]
pub struct DiscordApi {
    client: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    platform_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorizationInfo {
    user: Option<AuthorizationUser>,
}

#[derive(Debug, Deserialize)]
struct AuthorizationUser {
    id: String,
    username: Option<String>,
}

#[derive(Debug, Serialize)]
struct RoleConnectionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    platform_name: Option<&'a str>,
    metadata: &'a EntitlementFlags,
}

impl DiscordApi {
    pub fn new(client: reqwest::Client, settings: &AppSettings) -> Self {
        Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            platform_name: settings.platform_name.clone(),
        }
    }

    pub fn from_settings(settings: &AppSettings) -> AppResult<Self> {
        let client = http_client(settings.http_timeout())?;
        Ok(Self::new(client, settings))
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.api_base)
    }

    fn identity_url(&self) -> String {
        format!("{}/oauth2/@me", self.api_base)
    }

    fn role_connection_url(&self) -> String {
        format!(
            "{}/users/@me/applications/{}/role-connection",
            self.api_base, self.client_id
        )
    }

    pub(crate) fn metadata_schema_url(&self) -> String {
        format!(
            "{}/applications/{}/role-connections/metadata",
            self.api_base, self.client_id
        )
    }

    /// Trade a refresh token for a new token set.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> AppResult<OAuthTokenSet> {
        refresh_access_token(
            &self.client,
            &TokenRefreshRequest {
                token_uri: self.token_url(),
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
                refresh_token: refresh_token.to_string(),
            },
        )
        .await
    }

    async fn exchange_code_impl(&self, code: &str) -> AppResult<OAuthTokenSet> {
        exchange_authorization_code(
            &self.client,
            &TokenExchangeRequest {
                token_uri: self.token_url(),
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
                code: code.to_string(),
                redirect_uri: self.redirect_uri.clone(),
            },
        )
        .await
    }

    async fn fetch_identity_impl(&self, tokens: &OAuthTokenSet) -> AppResult<UserIdentity> {
        let response = self
            .client
            .get(self.identity_url())
            .header(AUTHORIZATION, tokens.authorization_header())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| format!("SYSTEM_ERROR: identity request failed: {e}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("SYSTEM_ERROR: identity response read failed: {e}"))?;
        if !status.is_success() {
            return Err(format!(
                "SYSTEM_ERROR: identity endpoint returned status={} body={}",
                status.as_u16(),
                sanitize_error_body_snippet(&body)
            )
            .into());
        }

        let info: AuthorizationInfo = serde_json::from_str(&body)
            .map_err(|e| format!("SYSTEM_ERROR: identity response json invalid: {e}"))?;
        let user = info
            .user
            .filter(|u| !u.id.trim().is_empty())
            .ok_or_else(|| "SYSTEM_ERROR: identity response missing user.id".to_string())?;

        Ok(UserIdentity {
            user_id: user.id.trim().to_string(),
            username: user.username,
        })
    }

    async fn push_metadata_impl(
        &self,
        user_id: &str,
        tokens: &OAuthTokenSet,
        flags: &EntitlementFlags,
    ) -> AppResult<()> {
        let body = RoleConnectionBody {
            platform_name: self.platform_name.as_deref(),
            metadata: flags,
        };
        let response = self
            .client
            .put(self.role_connection_url())
            .header(AUTHORIZATION, tokens.authorization_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("SYSTEM_ERROR: metadata push request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!(
                "SYSTEM_ERROR: metadata push for user {user_id} returned status={} body={}",
                status.as_u16(),
                sanitize_error_body_snippet(&body)
            )
            .into());
        }
        Ok(())
    }
}

impl PlatformApi for DiscordApi {
    fn exchange_code<'a>(&'a self, code: &'a str) -> PlatformFuture<'a, OAuthTokenSet> {
        Box::pin(self.exchange_code_impl(code))
    }

    fn fetch_identity<'a>(&'a self, tokens: &'a OAuthTokenSet) -> PlatformFuture<'a, UserIdentity> {
        Box::pin(self.fetch_identity_impl(tokens))
    }

    fn push_metadata<'a>(
        &'a self,
        user_id: &'a str,
        tokens: &'a OAuthTokenSet,
        flags: &'a EntitlementFlags,
    ) -> PlatformFuture<'a, ()> {
        Box::pin(self.push_metadata_impl(user_id, tokens, flags))
    }
}
