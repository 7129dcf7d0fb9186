//! Discord linked-role verification.
//!
//! `oauth::authorize` starts the consent flow, `oauth::callback` verifies the returned
//! state and pushes allow-list entitlements as role-connection metadata, `web` exposes both
//! as axum handlers.

pub mod app;
pub mod domain;
pub mod infra;
pub mod oauth;
pub mod platform;
pub mod shared;
pub mod web;

pub use domain::entitlements::{AllowLists, EntitlementFlag, EntitlementFlags};
pub use infra::settings::AppSettings;
pub use oauth::authorize::{AuthInitiator, AuthorizationRequest};
pub use oauth::callback::{CallbackError, CallbackOutcome, CallbackProcessor};
pub use oauth::token_exchange::OAuthTokenSet;
pub use platform::api::{PlatformApi, PlatformFuture, UserIdentity};
pub use shared::error::{AppError, AppResult};
pub use web::{build_router, WebState};
