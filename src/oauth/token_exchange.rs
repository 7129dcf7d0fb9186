//! Usage: OAuth token endpoint helpers (authorization_code + refresh_token grants).

use crate::shared::error::AppResult;
use crate::shared::security::{mask_token, sanitize_error_body_snippet};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

#[derive(Clone)]
pub struct TokenExchangeRequest {
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub code: String,
    pub redirect_uri: String,
}

#[derive(Clone)]
pub struct TokenRefreshRequest {
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenExchangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenExchangeRequest")
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("code", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl fmt::Debug for TokenRefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefreshRequest")
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &mask_token(&self.refresh_token))
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct OAuthTokenSet {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub scope: Option<String>,
}

impl OAuthTokenSet {
    /// Value for the `Authorization` header, e.g. `Bearer <access_token>`.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for OAuthTokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokenSet")
            .field("access_token", &mask_token(&self.access_token))
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(mask_token),
            )
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

pub async fn exchange_authorization_code(
    client: &reqwest::Client,
    req: &TokenExchangeRequest,
) -> AppResult<OAuthTokenSet> {
    let mut form: HashMap<&str, String> = HashMap::new();
    form.insert("grant_type", "authorization_code".to_string());
    form.insert("code", req.code.trim().to_string());
    form.insert("redirect_uri", req.redirect_uri.trim().to_string());

    let response = client
        .post(req.token_uri.trim())
        .basic_auth(req.client_id.trim(), Some(req.client_secret.trim()))
        .form(&form)
        .send()
        .await
        .map_err(|e| format!("SYSTEM_ERROR: oauth token exchange request failed: {e}"))?;

    parse_token_response(response).await
}

pub async fn refresh_access_token(
    client: &reqwest::Client,
    req: &TokenRefreshRequest,
) -> AppResult<OAuthTokenSet> {
    let mut form: HashMap<&str, String> = HashMap::new();
    form.insert("grant_type", "refresh_token".to_string());
    form.insert("refresh_token", req.refresh_token.trim().to_string());

    let response = client
        .post(req.token_uri.trim())
        .basic_auth(req.client_id.trim(), Some(req.client_secret.trim()))
        .form(&form)
        .send()
        .await
        .map_err(|e| format!("SYSTEM_ERROR: oauth refresh request failed: {e}"))?;

    parse_token_response(response).await
}

async fn parse_token_response(response: reqwest::Response) -> AppResult<OAuthTokenSet> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("SYSTEM_ERROR: oauth token response read failed: {e}"))?;

    if !status.is_success() {
        return Err(token_error_message(status.as_u16(), &body).into());
    }

    parse_token_body(&body, crate::shared::time::now_unix_seconds())
}

fn token_error_message(status: u16, body: &str) -> String {
    let (error_code, error_message) = parse_oauth_error_details(body);
    let mut msg = format!("SYSTEM_ERROR: oauth token endpoint returned status={status}");
    if let Some(code) = error_code {
        msg.push_str(" code=");
        msg.push_str(code.as_str());
    }
    if let Some(detail) = error_message {
        msg.push_str(" message=");
        msg.push_str(detail.chars().take(240).collect::<String>().as_str());
    }
    msg.push_str(" body=");
    msg.push_str(sanitize_error_body_snippet(body).as_str());
    msg
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_token_body(body: &str, now_unix: i64) -> AppResult<OAuthTokenSet> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| format!("SYSTEM_ERROR: oauth token response json invalid: {e}"))?;

    let access_token = non_empty_str(&value, "access_token")
        .ok_or_else(|| "SYSTEM_ERROR: oauth token response missing access_token".to_string())?;
    let token_type =
        non_empty_str(&value, "token_type").unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
    let refresh_token = non_empty_str(&value, "refresh_token");
    let scope = non_empty_str(&value, "scope");

    let expires_in = value.get("expires_in").and_then(parse_i64_lossy);
    let expires_at = expires_in.and_then(|v| {
        if v <= 0 {
            None
        } else {
            Some(now_unix.saturating_add(v))
        }
    });

    Ok(OAuthTokenSet {
        access_token,
        token_type,
        refresh_token,
        expires_at,
        scope,
    })
}

fn parse_i64_lossy(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_oauth_error_details(body: &str) -> (Option<String>, Option<String>) {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return (None, None),
    };

    let code = non_empty_str(&value, "error");
    let message =
        non_empty_str(&value, "error_description").or_else(|| non_empty_str(&value, "message"));
    (code, message)
}
