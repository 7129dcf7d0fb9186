//! Usage: Second hop of the linked-role flow.
//!
//! Pipeline: verify state -> exchange code -> fetch identity -> authorize -> push metadata.
//! Every step is terminal on failure; nothing is retried or rolled back.

use crate::domain::entitlements::{AllowLists, EntitlementFlags};
use crate::platform::api::{PlatformApi, UserIdentity};
use crate::shared::error::AppError;
use crate::shared::security::constant_time_eq;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("oauth callback state mismatch")]
    StateMismatch,

    #[error("oauth callback missing code")]
    MissingCode,

    #[error("user {user_id} is not in any allow-list")]
    Unauthorized { user_id: String },

    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(#[source] AppError),

    #[error("identity fetch failed: {0}")]
    IdentityFetchFailed(#[source] AppError),

    #[error("metadata push failed: {0}")]
    MetadataPushFailed(#[source] AppError),
}

impl CallbackError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::StateMismatch => "LR_STATE_MISMATCH",
            Self::MissingCode => "LR_MISSING_CODE",
            Self::Unauthorized { .. } => "LR_UNAUTHORIZED",
            Self::TokenExchangeFailed(_) => "LR_TOKEN_EXCHANGE_FAILED",
            Self::IdentityFetchFailed(_) => "LR_IDENTITY_FETCH_FAILED",
            Self::MetadataPushFailed(_) => "LR_METADATA_PUSH_FAILED",
        }
    }

    /// Platform or transport failure, as opposed to a rejected caller.
    pub const fn is_platform_failure(&self) -> bool {
        matches!(
            self,
            Self::TokenExchangeFailed(_) | Self::IdentityFetchFailed(_) | Self::MetadataPushFailed(_)
        )
    }
}

/// Successful callback: the flags pushed for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackOutcome {
    pub user_id: String,
    pub flags: EntitlementFlags,
}

#[derive(Clone)]
pub struct CallbackProcessor {
    platform: Arc<dyn PlatformApi>,
    allow_lists: Arc<AllowLists>,
}

impl CallbackProcessor {
    pub fn new(platform: Arc<dyn PlatformApi>, allow_lists: Arc<AllowLists>) -> Self {
        Self {
            platform,
            allow_lists,
        }
    }

    /// `persisted_state` is `None` when the caller's store had no live (signed, unexpired) value.
    pub async fn process(
        &self,
        code: &str,
        returned_state: &str,
        persisted_state: Option<&str>,
    ) -> Result<CallbackOutcome, CallbackError> {
        verify_state(returned_state, persisted_state)?;

        let code = code.trim();
        if code.is_empty() {
            return Err(CallbackError::MissingCode);
        }

        let tokens = self
            .platform
            .exchange_code(code)
            .await
            .map_err(CallbackError::TokenExchangeFailed)?;

        let identity = self
            .platform
            .fetch_identity(&tokens)
            .await
            .map_err(CallbackError::IdentityFetchFailed)?;
        let UserIdentity { user_id, username } = identity;

        let flags = self
            .allow_lists
            .resolve(&user_id)
            .ok_or_else(|| CallbackError::Unauthorized {
                user_id: user_id.clone(),
            })?;

        self.platform
            .push_metadata(&user_id, &tokens, &flags)
            .await
            .map_err(CallbackError::MetadataPushFailed)?;

        tracing::info!(
            user_id = %user_id,
            username = username.as_deref().unwrap_or("-"),
            flags = ?flags,
            "role connection metadata pushed"
        );
        Ok(CallbackOutcome { user_id, flags })
    }
}

fn verify_state(returned: &str, persisted: Option<&str>) -> Result<(), CallbackError> {
    let persisted = persisted
        .filter(|v| !v.is_empty())
        .ok_or(CallbackError::StateMismatch)?;
    if returned.is_empty() || !constant_time_eq(returned.as_bytes(), persisted.as_bytes()) {
        return Err(CallbackError::StateMismatch);
    }
    Ok(())
}
