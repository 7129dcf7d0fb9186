//! Usage: Service settings (schema + TOML/env loading, sanitize and validation helpers).

use crate::domain::entitlements::{AllowLists, EntitlementFlag};
use crate::oauth::state::MIN_COOKIE_SECRET_LEN;
use crate::shared::error::AppResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "LINKED_ROLE_CONFIG";
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
pub const STATE_COOKIE_NAME: &str = "clientState";
pub const DEFAULT_STATE_TTL_SECONDS: u32 = 5 * 60;
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u32 = 10;
const MAX_STATE_TTL_SECONDS: u32 = 60 * 60;
const MAX_HTTP_TIMEOUT_SECONDS: u32 = 60;

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    // Bot token; only the metadata schema registration uses it.
    pub bot_token: Option<String>,
    pub cookie_secret: String,
    pub api_base: String,
    pub authorize_url: String,
    pub platform_name: Option<String>,
    pub http_timeout_seconds: u32,
    pub state_ttl_seconds: u32,
    pub allow_lists: AllowLists,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            bot_token: None,
            cookie_secret: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            platform_name: None,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            state_ttl_seconds: DEFAULT_STATE_TTL_SECONDS,
            allow_lists: AllowLists::default(),
        }
    }
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("cookie_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("authorize_url", &self.authorize_url)
            .field("platform_name", &self.platform_name)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .field("state_ttl_seconds", &self.state_ttl_seconds)
            .field("allow_lists", &self.allow_lists)
            .finish()
    }
}

impl AppSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.http_timeout_seconds))
    }

}

/// Load from `$LINKED_ROLE_CONFIG` (if set) and the process environment.
pub fn load() -> AppResult<AppSettings> {
    let path = std::env::var_os(CONFIG_PATH_ENV);
    load_from(path.as_deref().map(Path::new), |key| std::env::var(key).ok())
}

pub fn load_from(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> AppResult<AppSettings> {
    let mut settings = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                format!(
                    "SYSTEM_ERROR: failed to read settings file {}: {e}",
                    path.display()
                )
            })?;
            from_toml_str(&raw)?
        }
        None => AppSettings::default(),
    };

    apply_env_overrides(&mut settings, env)?;
    sanitize(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

pub fn from_toml_str(raw: &str) -> AppResult<AppSettings> {
    toml::from_str(raw)
        .map_err(|e| format!("SEC_INVALID_INPUT: settings toml invalid: {e}").into())
}

fn allow_list_env_key(flag: EntitlementFlag) -> String {
    format!("LINKED_ROLE_ALLOW_{}", flag.as_key().to_ascii_uppercase())
}

fn apply_env_overrides(
    settings: &mut AppSettings,
    env: impl Fn(&str) -> Option<String>,
) -> AppResult<()> {
    let non_empty = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = non_empty("DISCORD_CLIENT_ID") {
        settings.client_id = v;
    }
    if let Some(v) = non_empty("DISCORD_CLIENT_SECRET") {
        settings.client_secret = v;
    }
    if let Some(v) = non_empty("DISCORD_REDIRECT_URI") {
        settings.redirect_uri = v;
    }
    if let Some(v) = non_empty("DISCORD_TOKEN") {
        settings.bot_token = Some(v);
    }
    if let Some(v) = non_empty("COOKIE_SECRET") {
        settings.cookie_secret = v;
    }
    if let Some(v) = non_empty("LINKED_ROLE_API_BASE") {
        settings.api_base = v;
    }
    if let Some(v) = non_empty("LINKED_ROLE_AUTHORIZE_URL") {
        settings.authorize_url = v;
    }
    if let Some(v) = non_empty("LINKED_ROLE_PLATFORM_NAME") {
        settings.platform_name = Some(v);
    }
    if let Some(v) = non_empty("LINKED_ROLE_HTTP_TIMEOUT_SECONDS") {
        settings.http_timeout_seconds = v.parse().map_err(|_| {
            format!("SEC_INVALID_INPUT: LINKED_ROLE_HTTP_TIMEOUT_SECONDS must be an integer, got {v}")
        })?;
    }

    let mut allow_lists = settings.allow_lists.clone();
    for flag in EntitlementFlag::ALL {
        if let Some(raw) = env(&allow_list_env_key(flag)) {
            allow_lists = allow_lists.with_members(flag, raw.split(','));
        }
    }
    settings.allow_lists = allow_lists;

    Ok(())
}

fn sanitize(settings: &mut AppSettings) {
    settings.client_id = settings.client_id.trim().to_string();
    settings.redirect_uri = settings.redirect_uri.trim().to_string();
    settings.platform_name = settings
        .platform_name
        .take()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    settings.bot_token = settings
        .bot_token
        .take()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    if settings.http_timeout_seconds == 0 {
        settings.http_timeout_seconds = DEFAULT_HTTP_TIMEOUT_SECONDS;
    }
    if settings.http_timeout_seconds > MAX_HTTP_TIMEOUT_SECONDS {
        settings.http_timeout_seconds = MAX_HTTP_TIMEOUT_SECONDS;
    }
    if settings.state_ttl_seconds == 0 {
        settings.state_ttl_seconds = DEFAULT_STATE_TTL_SECONDS;
    }
    if settings.state_ttl_seconds > MAX_STATE_TTL_SECONDS {
        settings.state_ttl_seconds = MAX_STATE_TTL_SECONDS;
    }
}

fn validate(settings: &AppSettings) -> AppResult<()> {
    let required = [
        ("client_id", settings.client_id.as_str()),
        ("client_secret", settings.client_secret.as_str()),
        ("redirect_uri", settings.redirect_uri.as_str()),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(format!("SEC_INVALID_INPUT: settings missing {name}").into());
        }
    }

    if settings.cookie_secret.len() < MIN_COOKIE_SECRET_LEN {
        return Err(format!(
            "SEC_INVALID_INPUT: cookie_secret must be at least {MIN_COOKIE_SECRET_LEN} bytes"
        )
        .into());
    }

    for (name, value) in [
        ("api_base", settings.api_base.as_str()),
        ("authorize_url", settings.authorize_url.as_str()),
        ("redirect_uri", settings.redirect_uri.as_str()),
    ] {
        reqwest::Url::parse(value.trim())
            .map_err(|e| format!("SEC_INVALID_INPUT: settings {name} is not a valid url: {e}"))?;
    }

    Ok(())
}
