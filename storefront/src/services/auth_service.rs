// storefront/src/services/auth_service.rs

//! Password hashing and account lookups used by sign-up, sign-in and the
//! request extractors.

use crate::errors::AppError;
use crate::models::user::{User, UserRole};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

pub const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing failed: {}", argon_err))
    })
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unusable.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password).map_err(|parse_err| {
    error!(error = %parse_err, "Stored password hash is malformed.");
    AppError::Internal(format!("Invalid stored password hash: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password mismatch.");
      Ok(false)
    }
    Err(other) => Err(AppError::Internal(format!("Password verification failed: {}", other))),
  }
}

pub fn normalize_email(email: &str) -> String {
  email.trim().to_ascii_lowercase()
}

pub async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, AppError> {
  let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
  Ok(sqlx::query_as::<_, User>(&sql).bind(user_id).fetch_optional(pool).await?)
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
  let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
  Ok(
    sqlx::query_as::<_, User>(&sql)
      .bind(normalize_email(email))
      .fetch_optional(pool)
      .await?,
  )
}

/// The role as stored now, not as it was when the session was issued.
pub async fn current_role(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRole>, AppError> {
  Ok(
    sqlx::query_scalar::<_, UserRole>("SELECT role FROM users WHERE id = $1")
      .bind(user_id)
      .fetch_optional(pool)
      .await?,
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify() {
    let hash = hash_password("masala123").unwrap();
    assert_ne!(hash, "masala123");
    assert!(verify_password(&hash, "masala123").unwrap());
    assert!(!verify_password(&hash, "masala124").unwrap());
    assert!(!verify_password(&hash, "").unwrap());
  }

  #[test]
  fn empty_password_cannot_be_hashed() {
    assert!(matches!(hash_password(""), Err(AppError::Validation(_))));
  }

  #[test]
  fn malformed_stored_hash_is_internal_error() {
    assert!(matches!(verify_password("not-a-phc-string", "x"), Err(AppError::Internal(_))));
  }

  #[test]
  fn emails_are_normalized() {
    assert_eq!(normalize_email("  Chef@Example.COM "), "chef@example.com");
  }
}
