// storefront/src/services/session_service.rs

//! Stateless session tokens: `{user_id}.{expires_unix}.{hex hmac-sha256}`.
//! Carried in the `tsb_token` cookie or an `Authorization: Bearer` header.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "tsb_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaims {
  pub user_id: Uuid,
  pub expires_at: i64,
}

fn mac_for(secret: &str, payload: &str) -> Option<HmacSha256> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
  mac.update(payload.as_bytes());
  Some(mac)
}

pub fn issue_token(secret: &str, user_id: Uuid, ttl_days: i64, now: DateTime<Utc>) -> Result<String, AppError> {
  let expires_at = (now + Duration::days(ttl_days)).timestamp();
  let payload = format!("{}.{}", user_id, expires_at);
  let mac = mac_for(secret, &payload).ok_or_else(|| AppError::Config("Unusable SESSION_SECRET".to_string()))?;
  let signature = hex::encode(mac.finalize().into_bytes());
  Ok(format!("{}.{}", payload, signature))
}

/// `None` for malformed, tampered or expired tokens.
pub fn verify_token(secret: &str, token: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
  let (payload, signature_hex) = token.trim().rsplit_once('.')?;
  let (user_part, expiry_part) = payload.split_once('.')?;

  let signature = hex::decode(signature_hex).ok()?;
  if mac_for(secret, payload)?.verify_slice(&signature).is_err() {
    debug!("Session token signature mismatch.");
    return None;
  }

  let user_id = Uuid::parse_str(user_part).ok()?;
  let expires_at: i64 = expiry_part.parse().ok()?;
  if expires_at <= now.timestamp() {
    debug!(%user_id, "Session token expired.");
    return None;
  }
  Some(SessionClaims { user_id, expires_at })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn issued_token_verifies() {
    let now = Utc::now();
    let user_id = Uuid::new_v4();
    let token = issue_token("secret", user_id, 7, now).unwrap();
    let claims = verify_token("secret", &token, now).unwrap();
    assert_eq!(claims.user_id, user_id);
    assert_eq!(claims.expires_at, (now + Duration::days(7)).timestamp());
  }

  #[test]
  fn wrong_secret_or_tampering_is_rejected() {
    let now = Utc::now();
    let token = issue_token("secret", Uuid::new_v4(), 7, now).unwrap();
    assert!(verify_token("other", &token, now).is_none());

    let forged = token.replacen(&token[..36], &Uuid::new_v4().to_string(), 1);
    assert!(verify_token("secret", &forged, now).is_none());
    assert!(verify_token("secret", "garbage", now).is_none());
  }

  #[test]
  fn expired_token_is_rejected() {
    let issued = Utc::now() - Duration::days(8);
    let token = issue_token("secret", Uuid::new_v4(), 7, issued).unwrap();
    assert!(verify_token("secret", &token, Utc::now()).is_none());
  }
}
