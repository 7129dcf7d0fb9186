//! Usage: `PlatformApi` trait - the outbound operations the callback pipeline depends on.
//!
//! The trait is object-safe so the processor can hold `Arc<dyn PlatformApi>`; the reqwest
//! implementation lives in `platform::discord`, tests swap in an in-memory fake.

use crate::domain::entitlements::EntitlementFlags;
use crate::oauth::token_exchange::OAuthTokenSet;
use crate::shared::error::AppResult;
use std::future::Future;
use std::pin::Pin;

pub type PlatformFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Identity returned by the platform's `@me` endpoint. Only the id drives entitlements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    pub username: Option<String>,
}

pub trait PlatformApi: Send + Sync {
    /// Trade an authorization code for a token set.
    fn exchange_code<'a>(&'a self, code: &'a str) -> PlatformFuture<'a, OAuthTokenSet>;

    /// Fetch the authorizing user's identity with their access token.
    fn fetch_identity<'a>(&'a self, tokens: &'a OAuthTokenSet) -> PlatformFuture<'a, UserIdentity>;

    /// Upsert the user's role-connection metadata, authenticated as the user.
    fn push_metadata<'a>(
        &'a self,
        user_id: &'a str,
        tokens: &'a OAuthTokenSet,
        flags: &'a EntitlementFlags,
    ) -> PlatformFuture<'a, ()>;
}
