use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use linked_role_gate::{
    AllowLists, AppError, AppResult, CallbackProcessor, EntitlementFlags, OAuthTokenSet,
    PlatformApi, PlatformFuture, UserIdentity,
};

#[allow(dead_code)]
pub const COOKIE_SECRET: &[u8] = b"test-cookie-secret-0123456789abcdef";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    ExchangeCode,
    FetchIdentity,
    PushMetadata,
}

/// In-memory platform: records every call and keeps one metadata record per user.
#[derive(Default)]
pub struct FakePlatform {
    user_id: String,
    fail_exchange: bool,
    fail_identity: bool,
    fail_push: bool,
    calls: Mutex<Vec<Call>>,
    records: Mutex<HashMap<String, EntitlementFlags>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().expect("fake platform lock")
}

#[allow(dead_code)]
impl FakePlatform {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Self::default()
        }
    }

    pub fn failing_exchange(mut self) -> Self {
        self.fail_exchange = true;
        self
    }

    pub fn failing_identity(mut self) -> Self {
        self.fail_identity = true;
        self
    }

    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn calls_of(&self, call: Call) -> usize {
        lock(&self.calls).iter().filter(|c| **c == call).count()
    }

    pub fn records(&self) -> HashMap<String, EntitlementFlags> {
        lock(&self.records).clone()
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn tokens() -> OAuthTokenSet {
        OAuthTokenSet {
            access_token: "fake-access-token-123456".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("fake-refresh-token-123456".to_string()),
            expires_at: None,
            scope: Some("identify role_connections.write".to_string()),
        }
    }
}

impl PlatformApi for FakePlatform {
    fn exchange_code<'a>(&'a self, _code: &'a str) -> PlatformFuture<'a, OAuthTokenSet> {
        self.record(Call::ExchangeCode);
        let result: AppResult<OAuthTokenSet> = if self.fail_exchange {
            Err(AppError::new(
                "SYSTEM_ERROR",
                "oauth token endpoint returned status=400 code=invalid_grant",
            ))
        } else {
            Ok(Self::tokens())
        };
        Box::pin(async move { result })
    }

    fn fetch_identity<'a>(&'a self, _tokens: &'a OAuthTokenSet) -> PlatformFuture<'a, UserIdentity> {
        self.record(Call::FetchIdentity);
        let result = if self.fail_identity {
            Err(AppError::new(
                "SYSTEM_ERROR",
                "identity endpoint returned status=401",
            ))
        } else {
            Ok(UserIdentity {
                user_id: self.user_id.clone(),
                username: Some("tester".to_string()),
            })
        };
        Box::pin(async move { result })
    }

    fn push_metadata<'a>(
        &'a self,
        user_id: &'a str,
        _tokens: &'a OAuthTokenSet,
        flags: &'a EntitlementFlags,
    ) -> PlatformFuture<'a, ()> {
        self.record(Call::PushMetadata);
        let result = if self.fail_push {
            Err(AppError::new(
                "SYSTEM_ERROR",
                "metadata push returned status=500",
            ))
        } else {
            lock(&self.records).insert(user_id.to_string(), flags.clone());
            Ok(())
        };
        Box::pin(async move { result })
    }
}

#[allow(dead_code)]
pub fn processor(platform: Arc<FakePlatform>) -> CallbackProcessor {
    CallbackProcessor::new(platform, Arc::new(AllowLists::default()))
}
