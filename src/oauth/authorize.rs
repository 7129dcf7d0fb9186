//! Usage: First hop of the linked-role flow (consent URL + fresh anti-forgery token).

use super::state::generate_state_token;
use crate::infra::settings::AppSettings;
use crate::shared::error::AppResult;
use reqwest::Url;

/// Scopes requested on the consent screen.
pub const SCOPES: &[&str] = &["identify", "role_connections.write"];

/// Result of [`AuthInitiator::initiate`]. The caller persists `state` and redirects to `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

#[derive(Debug, Clone)]
pub struct AuthInitiator {
    authorize_url: Url,
    client_id: String,
    redirect_uri: String,
}

impl AuthInitiator {
    pub fn new(authorize_url: &str, client_id: &str, redirect_uri: &str) -> AppResult<Self> {
        let authorize_url = Url::parse(authorize_url.trim())
            .map_err(|e| format!("SYSTEM_ERROR: invalid oauth authorize url: {e}"))?;
        Ok(Self {
            authorize_url,
            client_id: client_id.trim().to_string(),
            redirect_uri: redirect_uri.trim().to_string(),
        })
    }

    pub fn from_settings(settings: &AppSettings) -> AppResult<Self> {
        Self::new(
            &settings.authorize_url,
            &settings.client_id,
            &settings.redirect_uri,
        )
    }

    pub fn initiate(&self) -> AuthorizationRequest {
        let state = generate_state_token();
        let url = self.authorize_url_for(&state);
        AuthorizationRequest { url, state }
    }

    pub fn authorize_url_for(&self, state: &str) -> String {
        let mut url = self.authorize_url.clone();
        {
            let scope = SCOPES.join(" ");
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.client_id);
            query.append_pair("redirect_uri", &self.redirect_uri);
            query.append_pair("response_type", "code");
            query.append_pair("state", state);
            query.append_pair("scope", &scope);
            query.append_pair("prompt", "consent");
        }
        url.to_string()
    }
}
