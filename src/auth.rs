//! Bearer-token authentication (spec.md §6.2).
//!
//! The full credential store (signup, password reset, session rotation)
//! is out of scope (spec.md Non-goals); what every handler still needs is
//! a trustworthy `userId` to scope ownership checks against. Tokens here
//! are `"<userId>.<hex hmac-sha256 signature>"`, verified against a single
//! configured signing secret — grounded in the pack's HMAC-over-payload
//! token schemes (`hxrts-aura`, `prospectorengine-prospector-btc`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Recovers the authenticated `userId` from a bearer token, or rejects it
/// if the signature doesn't match the configured secret.
pub fn verify_token(signing_secret: &str, token: &str) -> Result<String, AppError> {
    let (user_id, signature_hex) = token
        .rsplit_once('.')
        .ok_or_else(|| AppError::Auth("malformed bearer token".into()))?;
    if user_id.is_empty() {
        return Err(AppError::Auth("malformed bearer token".into()));
    }

    let signature = hex::decode(signature_hex)
        .map_err(|_| AppError::Auth("malformed bearer token signature".into()))?;

    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|_| AppError::Auth("invalid signing secret".into()))?;
    mac.update(user_id.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Auth("bearer token signature mismatch".into()))?;

    Ok(user_id.to_string())
}

/// Issues a bearer token for `user_id`, used by tests and by any
/// operator tooling that mints tokens outside the (out-of-scope) external
/// credential store.
pub fn sign_token(signing_secret: &str, user_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts a key of any length");
    mac.update(user_id.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("{user_id}.{signature}")
}
