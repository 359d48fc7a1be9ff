// storefront/src/web/handlers/auth_handlers.rs

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use bazaar_flow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::user::PublicUser;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::auth_service;
use crate::services::session_service::SESSION_COOKIE;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct RegisterPayload {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

fn session_cookie(token: &str, ttl_days: i64) -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE, token.to_string())
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .max_age(CookieDuration::days(ttl_days))
    .finish()
}

fn session_response(mut builder: actix_web::HttpResponseBuilder, app_state: &AppState, user: PublicUser, token: String) -> HttpResponse {
  builder
    .cookie(session_cookie(&token, app_state.config.session_ttl_days))
    .json(json!({ "user": user, "token": token }))
}

#[instrument(name = "handler::register", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    name: payload.name,
    email: payload.email,
    password: payload.password,
    created_user: None,
    session_token: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (user, token) = {
        let guard = ctx_data.read();
        (guard.created_user.clone(), guard.session_token.clone())
      };
      let (Some(user), Some(token)) = (user, token) else {
        return Err(AppError::Internal("Sign-up completed without a user or token".to_string()));
      };
      info!(user_id = %user.id, "Sign-up successful.");
      Ok(session_response(HttpResponse::Created(), &app_state, user, token))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Sign-up pipeline was stopped by a handler.");
      Err(AppError::Internal("Sign-up was halted by an internal step.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::login", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email,
    password: payload.password,
    temp_password_hash: None,
    user: None,
    session_token: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (user, token) = {
        let guard = ctx_data.read();
        (guard.user.clone(), guard.session_token.clone())
      };
      let (Some(user), Some(token)) = (user, token) else {
        return Err(AppError::Auth("Invalid email or password".to_string()));
      };
      info!(user_id = %user.id, "Sign-in successful.");
      Ok(session_response(HttpResponse::Ok(), &app_state, user, token))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Sign-in pipeline was stopped by a handler.");
      Err(AppError::Auth("Invalid email or password".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::logout")]
pub async fn logout_handler() -> HttpResponse {
  let mut expired = Cookie::build(SESSION_COOKIE, "").path("/").http_only(true).finish();
  expired.make_removal();
  HttpResponse::Ok().cookie(expired).json(json!({ "success": true }))
}

/// Always 200; `user` is null without a usable session.
#[instrument(name = "handler::me", skip_all)]
pub async fn me_handler(
  app_state: web::Data<AppState>,
  auth_user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
  let user = match auth_user {
    Some(auth_user) => auth_service::find_user_by_id(&app_state.db_pool, auth_user.user_id)
      .await?
      .map(|user| PublicUser::from(&user)),
    None => None,
  };
  Ok(HttpResponse::Ok().json(json!({ "user": user })))
}
