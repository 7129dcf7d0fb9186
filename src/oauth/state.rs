//! Usage: Anti-forgery `state` tokens and their tamper-evident, expiring cookie encoding.
//!
//! Sealed format: `<state>.<expires_at_unix>.<sig>` where `sig` is
//! base64url(HMAC-SHA256(secret, "<state>.<expires_at_unix>")).

use crate::shared::error::AppResult;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const STATE_TOKEN_BYTES: usize = 32;
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

/// Fresh anti-forgery token: 256 bits from the OS RNG, hex encoded.
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; STATE_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateCookieError {
    #[error("malformed state cookie")]
    Malformed,

    #[error("invalid state cookie signature")]
    InvalidSignature,

    #[error("state cookie expired")]
    Expired,
}

#[derive(Clone)]
pub struct SignedStateCookie {
    mac: HmacSha256,
    ttl_secs: i64,
}

impl fmt::Debug for SignedStateCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedStateCookie")
            .field("secret", &"[REDACTED]")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl SignedStateCookie {
    pub fn new(secret: &[u8], ttl_secs: i64) -> AppResult<Self> {
        if secret.len() < MIN_COOKIE_SECRET_LEN {
            return Err(format!(
                "SEC_INVALID_INPUT: cookie secret must be at least {MIN_COOKIE_SECRET_LEN} bytes"
            )
            .into());
        }
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| format!("SYSTEM_ERROR: cookie signer init failed: {e}"))?;
        Ok(Self {
            mac,
            ttl_secs: ttl_secs.max(1),
        })
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn seal(&self, state: &str, now_unix: i64) -> String {
        let payload = format!("{state}.{}", now_unix.saturating_add(self.ttl_secs));
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload));
        format!("{payload}.{signature}")
    }

    /// Verify signature and expiry, returning the original state token.
    pub fn open(&self, sealed: &str, now_unix: i64) -> Result<String, StateCookieError> {
        let (payload, signature) = sealed
            .trim()
            .rsplit_once('.')
            .ok_or(StateCookieError::Malformed)?;
        let (state, expires_at) = payload
            .rsplit_once('.')
            .ok_or(StateCookieError::Malformed)?;
        if state.is_empty() {
            return Err(StateCookieError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| StateCookieError::Malformed)?;
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| StateCookieError::InvalidSignature)?;

        let expires_at: i64 = expires_at
            .parse()
            .map_err(|_| StateCookieError::Malformed)?;
        if expires_at <= now_unix {
            return Err(StateCookieError::Expired);
        }

        Ok(state.to_string())
    }

    fn sign(&self, payload: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn signer() -> SignedStateCookie {
        SignedStateCookie::new(SECRET, 300).expect("signer")
    }

    #[test]
    fn generated_tokens_are_hex_and_unique() {
        let a = generate_state_token();
        let b = generate_state_token();
        assert_eq!(a.len(), STATE_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn sealed_state_opens_before_expiry() {
        let sealed = signer().seal("abc123", 1_000);
        assert_eq!(signer().open(&sealed, 1_299).as_deref(), Ok("abc123"));
    }

    #[test]
    fn sealed_state_expires_after_ttl() {
        let sealed = signer().seal("abc123", 1_000);
        assert_eq!(signer().open(&sealed, 1_300), Err(StateCookieError::Expired));
    }

    #[test]
    fn tampered_state_is_rejected() {
        let sealed = signer().seal("abc123", 1_000);
        let forged = sealed.replacen("abc123", "xyz789", 1);
        assert_eq!(
            signer().open(&forged, 1_001),
            Err(StateCookieError::InvalidSignature)
        );
    }

    #[test]
    fn extended_expiry_is_rejected() {
        let sealed = signer().seal("abc123", 1_000);
        let forged = sealed.replacen(".1300.", ".9999999999.", 1);
        assert_eq!(
            signer().open(&forged, 1_001),
            Err(StateCookieError::InvalidSignature)
        );
    }

    #[test]
    fn other_secret_cannot_open() {
        let other =
            SignedStateCookie::new(b"ffffffffffffffffffffffffffffffff", 300).expect("signer");
        let sealed = other.seal("abc123", 1_000);
        assert_eq!(
            signer().open(&sealed, 1_001),
            Err(StateCookieError::InvalidSignature)
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert_eq!(signer().open("", 0), Err(StateCookieError::Malformed));
        assert_eq!(signer().open("abc", 0), Err(StateCookieError::Malformed));
        assert_eq!(signer().open("abc.123", 0), Err(StateCookieError::Malformed));
        assert_eq!(
            signer().open("abc.123.!!!", 0),
            Err(StateCookieError::Malformed)
        );
    }

    #[test]
    fn short_secret_is_rejected() {
        let err = SignedStateCookie::new(b"short", 300).expect_err("too short");
        assert_eq!(err.code(), "SEC_INVALID_INPUT");
    }
}
