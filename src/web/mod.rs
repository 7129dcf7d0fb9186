//! Usage: axum handlers for the two hops of the linked-role flow.
//!
//! Binding and serving the router is left to the host process.

mod cookies;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::infra::settings::{AppSettings, STATE_COOKIE_NAME};
use crate::oauth::authorize::AuthInitiator;
use crate::oauth::callback::{CallbackError, CallbackProcessor};
use crate::oauth::state::SignedStateCookie;
use crate::platform::discord::DiscordApi;
use crate::shared::error::AppResult;
use crate::shared::time::now_unix_seconds;

const SUCCESS_TEXT: &str = "You did it! Now go back to Discord.";
const ACCESS_DENIED_TEXT: &str = "Access denied: User ID not in the allowed list.";

#[derive(Clone)]
pub struct WebState {
    initiator: Arc<AuthInitiator>,
    processor: CallbackProcessor,
    state_cookie: Arc<SignedStateCookie>,
    secure_cookie: bool,
}

impl WebState {
    pub fn new(
        initiator: AuthInitiator,
        processor: CallbackProcessor,
        state_cookie: SignedStateCookie,
        secure_cookie: bool,
    ) -> Self {
        Self {
            initiator: Arc::new(initiator),
            processor,
            state_cookie: Arc::new(state_cookie),
            secure_cookie,
        }
    }

    /// Wire the Discord client, allow-lists and cookie signer from settings.
    pub fn from_settings(settings: &AppSettings) -> AppResult<Self> {
        let initiator = AuthInitiator::from_settings(settings)?;
        let platform = Arc::new(DiscordApi::from_settings(settings)?);
        let processor = CallbackProcessor::new(platform, Arc::new(settings.allow_lists.clone()));
        let state_cookie = SignedStateCookie::new(
            settings.cookie_secret.as_bytes(),
            i64::from(settings.state_ttl_seconds),
        )?;
        let secure_cookie = settings.redirect_uri.trim().starts_with("https://");
        Ok(Self::new(initiator, processor, state_cookie, secure_cookie))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

impl CallbackQuery {
    pub fn new(code: Option<&str>, state: Option<&str>) -> Self {
        Self {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
        }
    }
}

async fn root() -> &'static str {
    "👋"
}

pub async fn linked_role(State(state): State<WebState>) -> Response {
    let request = state.initiator.initiate();
    let sealed = state.state_cookie.seal(&request.state, now_unix_seconds());
    let cookie = cookies::set_cookie(
        STATE_COOKIE_NAME,
        &sealed,
        state.state_cookie.ttl_secs(),
        state.secure_cookie,
    );

    tracing::debug!("redirecting to oauth consent screen");
    (
        StatusCode::FOUND,
        [(header::LOCATION, request.url), (header::SET_COOKIE, cookie)],
    )
        .into_response()
}

pub async fn discord_oauth_callback(
    State(state): State<WebState>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Response {
    let persisted = cookies::read_cookie(&headers, STATE_COOKIE_NAME).and_then(|raw| {
        match state.state_cookie.open(raw, now_unix_seconds()) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(reason = %err, "state cookie rejected");
                None
            }
        }
    });

    let result = state
        .processor
        .process(
            query.code.as_deref().unwrap_or_default(),
            query.state.as_deref().unwrap_or_default(),
            persisted.as_deref(),
        )
        .await;

    // The anti-forgery value is single-use regardless of outcome.
    let clear = cookies::clear_cookie(STATE_COOKIE_NAME, state.secure_cookie);
    match result {
        Ok(_) => (StatusCode::OK, [(header::SET_COOKIE, clear)], SUCCESS_TEXT).into_response(),
        Err(err) => {
            let (status, body) = error_response_parts(&err);
            if err.is_platform_failure() {
                tracing::error!(code = err.code(), error = %err, "linked role callback failed");
            } else {
                tracing::warn!(code = err.code(), error = %err, "linked role callback rejected");
            }
            (status, [(header::SET_COOKIE, clear)], body).into_response()
        }
    }
}

fn error_response_parts(err: &CallbackError) -> (StatusCode, &'static str) {
    match err {
        CallbackError::StateMismatch => (StatusCode::FORBIDDEN, "Forbidden"),
        CallbackError::Unauthorized { .. } => (StatusCode::FORBIDDEN, ACCESS_DENIED_TEXT),
        CallbackError::MissingCode => (StatusCode::BAD_REQUEST, "Bad Request"),
        CallbackError::TokenExchangeFailed(_)
        | CallbackError::IdentityFetchFailed(_)
        | CallbackError::MetadataPushFailed(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

pub fn build_router(state: WebState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/linked-role", get(linked_role))
        .route("/discord-oauth-callback", get(discord_oauth_callback))
        .with_state(state)
}
