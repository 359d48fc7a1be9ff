// storefront/src/web/extractors.rs

//! Request guards. `AuthenticatedUser` checks the session token only;
//! `AdminUser` also re-reads the role so a demotion takes effect at once.

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::Utc;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::UserRole;
use crate::services::auth_service;
use crate::services::session_service::{verify_token, SESSION_COOKIE};
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
  pub user_id: Uuid,
}

/// Bearer header first, then the session cookie.
fn session_token(req: &HttpRequest) -> Option<String> {
  let from_header = req
    .headers()
    .get(actix_web::http::header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .map(|token| token.trim().to_string())
    .filter(|token| !token.is_empty());
  from_header.or_else(|| req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()))
}

fn authenticate(req: &HttpRequest) -> Result<(AppState, Uuid), AppError> {
  let app_state = req
    .app_data::<web::Data<AppState>>()
    .map(|data| data.get_ref().clone())
    .ok_or_else(|| AppError::Internal("Application state not configured".to_string()))?;
  let token = session_token(req).ok_or_else(|| AppError::Auth("Unauthorized".to_string()))?;
  let claims = verify_token(&app_state.config.session_secret, &token, Utc::now()).ok_or_else(|| {
    warn!(path = %req.path(), "Rejected invalid or expired session token.");
    AppError::Auth("Unauthorized".to_string())
  })?;
  Ok((app_state, claims.user_id))
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(authenticate(req).map(|(_, user_id)| AuthenticatedUser { user_id }))
  }
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let authenticated = authenticate(req);
    Box::pin(async move {
      let (app_state, user_id) = authenticated?;
      match auth_service::current_role(&app_state.db_pool, user_id).await? {
        Some(UserRole::Admin) => Ok(AdminUser { user_id }),
        Some(UserRole::User) => {
          warn!(%user_id, "Non-admin tried an admin route.");
          Err(AppError::Forbidden("Admin access required".to_string()))
        }
        None => Err(AppError::Auth("Unauthorized".to_string())),
      }
    })
  }
}
