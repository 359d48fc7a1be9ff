// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
  User,
  Admin,
}

impl FromStr for UserRole {
  type Err = ();

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "USER" => Ok(UserRole::User),
      "ADMIN" => Ok(UserRole::Admin),
      _ => Err(()),
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub name: Option<String>,
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role: UserRole,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// What the API exposes about a signed-in user.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
  pub id: Uuid,
  pub name: Option<String>,
  pub email: String,
  pub role: UserRole,
}

impl From<&User> for PublicUser {
  fn from(user: &User) -> Self {
    Self {
      id: user.id,
      name: user.name.clone(),
      email: user.email.clone(),
      role: user.role,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn roles_parse_only_upper_case_names() {
    assert_eq!("ADMIN".parse::<UserRole>(), Ok(UserRole::Admin));
    assert_eq!("USER".parse::<UserRole>(), Ok(UserRole::User));
    assert!("admin".parse::<UserRole>().is_err());
    assert_eq!(serde_json::to_value(UserRole::Admin).unwrap(), "ADMIN");
  }
}
