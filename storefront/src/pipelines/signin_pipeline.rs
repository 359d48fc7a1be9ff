// storefront/src/pipelines/signin_pipeline.rs

use bazaar_flow::{ContextData, Flows, Pipeline, PipelineControl, StepDef};
use chrono::Utc;
use tracing::{event, warn, Level};

use crate::errors::AppError;
use crate::models::user::PublicUser;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::{auth_service, session_service};
use crate::state::AppState;

fn invalid_credentials() -> AppError {
  AppError::Auth("Invalid email or password".to_string())
}

pub fn register_signin_pipeline(flows: &Flows<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<SigninCtxData, AppError>::new(
    "signin",
    &[
      StepDef::required("validate_signin_input"),
      StepDef::required("fetch_user_by_email"),
      StepDef::required("verify_user_password"),
      StepDef::required("issue_session_token"),
    ],
  );

  p.on("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, password_is_empty) = {
        let guard = ctx_data.read();
        (guard.email.trim().to_string(), guard.password.is_empty())
      };
      if email.is_empty() || password_is_empty {
        warn!("Sign-in without email or password.");
        return Err(AppError::Validation("Email and password are required".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("fetch_user_by_email", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, db_pool) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.db_pool.clone())
      };
      let Some(user) = auth_service::find_user_by_email(&db_pool, &email).await? else {
        warn!("Sign-in for unknown email.");
        return Err(invalid_credentials());
      };
      event!(Level::DEBUG, user_id = %user.id, "User found for sign-in.");
      {
        let mut guard = ctx_data.write();
        guard.temp_password_hash = Some(user.password_hash.clone());
        guard.user = Some(PublicUser::from(&user));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("verify_user_password", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (stored_hash, password, user_id) = {
        let mut guard = ctx_data.write();
        (
          guard.temp_password_hash.take(),
          guard.password.clone(),
          guard.user.as_ref().map(|u| u.id),
        )
      };
      let stored_hash =
        stored_hash.ok_or_else(|| AppError::Internal("Password hash missing before verification".to_string()))?;

      if !auth_service::verify_password(&stored_hash, &password)? {
        warn!(user_id = ?user_id, "Password mismatch on sign-in.");
        return Err(invalid_credentials());
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("issue_session_token", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (user_id, config) = {
        let guard = ctx_data.read();
        (guard.user.as_ref().map(|u| u.id), guard.app_state.config.clone())
      };
      let user_id = user_id.ok_or_else(invalid_credentials)?;
      let token = session_service::issue_token(&config.session_secret, user_id, config.session_ttl_days, Utc::now())?;
      event!(Level::INFO, %user_id, "Session issued.");
      ctx_data.write().session_token = Some(token);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register(p);
  tracing::info!("Sign-in pipeline registered.");
}
