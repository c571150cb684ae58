//! Signed session tokens
//!
//! After a successful login, the client receives a session token, which identifies the logged in
//! user. The token is not stored on the server side. Instead, it is signed with the application
//! secret (HMAC-SHA256), so it cannot be forged by the client.
//!
//! Token format: `base64url({user_id}.{issued_at_unix}).base64url(hmac)`

use crate::data_store::UserId;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::hmac;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionToken {
    user_id: UserId,
    issued_at: i64,
}

impl SessionToken {
    pub fn new(user_id: UserId) -> Self {
        SessionToken {
            user_id,
            issued_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Parse and verify a session token string, as created by [Self::as_string].
    ///
    /// Tokens, which have been issued more than `max_age` ago (or in the future), are rejected.
    pub fn from_string(
        data: &str,
        secret: &str,
        max_age: std::time::Duration,
    ) -> Result<Self, SessionError> {
        let (payload_b64, signature_b64) = data
            .trim()
            .split_once('.')
            .ok_or(SessionError::InvalidTokenFormat)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| SessionError::InvalidTokenFormat)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| SessionError::InvalidTokenFormat)?;
        hmac::verify(&signing_key(secret), &payload, &signature)
            .map_err(|_| SessionError::SignatureVerificationFailed)?;

        let payload = String::from_utf8(payload).map_err(|_| SessionError::InvalidTokenFormat)?;
        let (user_id, issued_at) = payload
            .split_once('.')
            .ok_or(SessionError::InvalidTokenFormat)?;
        let token = SessionToken {
            user_id: user_id
                .parse()
                .map_err(|_| SessionError::InvalidTokenFormat)?,
            issued_at: issued_at
                .parse()
                .map_err(|_| SessionError::InvalidTokenFormat)?,
        };

        let age = chrono::Utc::now().timestamp() - token.issued_at;
        if age < 0 || age as u64 > max_age.as_secs() {
            return Err(SessionError::ExpiredToken);
        }
        Ok(token)
    }

    pub fn as_string(&self, secret: &str) -> String {
        let payload = format!("{}.{}", self.user_id, self.issued_at);
        let signature = hmac::sign(&signing_key(secret), payload.as_bytes());
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature.as_ref())
        )
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

fn signing_key(secret: &str) -> hmac::Key {
    hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes())
}

/// Generate a random, URL-safe string, e.g. for the OAuth2 `state` parameter
pub fn random_url_safe_string() -> Result<String, SessionError> {
    use ring::rand::SecureRandom;
    let mut bytes = [0u8; 24];
    ring::rand::SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| SessionError::RandomGeneratorFailed)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[derive(Debug)]
pub enum SessionError {
    InvalidTokenFormat,
    SignatureVerificationFailed,
    ExpiredToken,
    RandomGeneratorFailed,
}
