// storefront/src/pipelines/signup_pipeline.rs

use bazaar_flow::{ContextData, Flows, Pipeline, PipelineControl, StepDef};
use chrono::Utc;
use tracing::{event, info, warn, Level};
use uuid::Uuid;

use crate::errors::{is_unique_violation, AppError};
use crate::models::user::{PublicUser, User};
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service::{self, USER_COLUMNS};
use crate::services::session_service;
use crate::services::validation::RegisterInput;
use crate::state::AppState;

pub fn register_signup_pipeline(flows: &Flows<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<SignupCtxData, AppError>::new(
    "signup",
    &[
      StepDef::required("validate_signup_input"),
      StepDef::required("check_existing_user"),
      StepDef::required("create_user"),
      StepDef::required("issue_session_token"),
    ],
  );

  p.on("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let input = {
        let guard = ctx_data.read();
        RegisterInput {
          name: guard.name.clone(),
          email: guard.email.clone(),
          password: guard.password.clone(),
        }
      };
      event!(Level::DEBUG, email = %input.email, "Validating sign-up input.");
      input.validate()?;
      {
        let mut guard = ctx_data.write();
        guard.name = guard.name.trim().to_string();
        guard.email = auth_service::normalize_email(&guard.email);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("check_existing_user", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email, db_pool) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.db_pool.clone())
      };
      let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&db_pool)
        .await?;
      if exists {
        warn!(%email, "Sign-up with an email that is already registered.");
        return Err(AppError::Conflict("User already exists".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("create_user", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (name, email, password, db_pool) = {
        let guard = ctx_data.read();
        (
          guard.name.clone(),
          guard.email.clone(),
          guard.password.clone(),
          guard.app_state.db_pool.clone(),
        )
      };
      let password_hash = auth_service::hash_password(&password)?;

      let sql = format!(
        "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING {}",
        USER_COLUMNS
      );
      let user = sqlx::query_as::<_, User>(&sql)
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(&email)
        .bind(password_hash)
        .fetch_one(&db_pool)
        .await
        .map_err(|err| {
          if is_unique_violation(&err) {
            AppError::Conflict("User already exists".to_string())
          } else {
            AppError::Sqlx(err)
          }
        })?;

      info!(user_id = %user.id, "User account created.");
      ctx_data.write().created_user = Some(PublicUser::from(&user));
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("issue_session_token", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (user_id, config) = {
        let guard = ctx_data.read();
        (guard.created_user.as_ref().map(|u| u.id), guard.app_state.config.clone())
      };
      let user_id = user_id.ok_or_else(|| AppError::Internal("Sign-up reached token issue without a user".to_string()))?;
      let token = session_service::issue_token(&config.session_secret, user_id, config.session_ttl_days, Utc::now())?;
      ctx_data.write().session_token = Some(token);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register(p);
  tracing::info!("Sign-up pipeline registered.");
}
