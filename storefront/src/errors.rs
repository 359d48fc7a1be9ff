// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use bazaar_flow::FlowError;
use serde_json::json;
use thiserror::Error;

use crate::services::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  /// Field-level input errors, rendered as `{"error": {"fieldErrors": {...}}}`.
  #[error("Invalid input: {0}")]
  InvalidInput(FieldErrors),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Payment verification failed")]
  PaymentVerification,

  #[error("Payment Gateway Error: {0}")]
  Gateway(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(other) => AppError::Internal(format!("{:#}", other)),
    }
  }
}

impl From<sqlx::migrate::MigrateError> for AppError {
  fn from(err: sqlx::migrate::MigrateError) -> Self {
    AppError::Internal(format!("Migration failed: {}", err))
  }
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn sqlx_constraint_status(err: &sqlx::Error) -> Option<(StatusCode, &'static str)> {
  let sqlx::Error::Database(db_err) = err else {
    return None;
  };
  if db_err.is_unique_violation() {
    Some((StatusCode::CONFLICT, "Resource already exists"))
  } else if db_err.is_foreign_key_violation() {
    Some((StatusCode::CONFLICT, "Resource is still referenced"))
  } else if db_err.is_check_violation() {
    Some((StatusCode::BAD_REQUEST, "Value out of range"))
  } else {
    None
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::InvalidInput(_) | AppError::PaymentVerification => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
      AppError::Sqlx(e) => sqlx_constraint_status(e).map_or(StatusCode::INTERNAL_SERVER_ERROR, |(s, _)| s),
      AppError::Config(_) | AppError::Workflow { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Request rejected");
    }

    let body = match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m) => json!({ "error": m }),
      AppError::InvalidInput(fields) => json!({ "error": { "fieldErrors": fields } }),
      AppError::PaymentVerification => json!({ "error": "Payment verification failed" }),
      AppError::Gateway(m) => json!({ "error": "Payment provider error", "detail": m }),
      AppError::Config(m) => json!({ "error": "Configuration issue", "detail": m }),
      AppError::Sqlx(e) => match sqlx_constraint_status(e) {
        Some((_, message)) => json!({ "error": message }),
        None => json!({ "error": "Database operation failed" }),
      },
      AppError::Workflow { source } => json!({ "error": "Workflow processing error", "detail": source.to_string() }),
      AppError::Internal(_) => json!({ "error": "An internal error occurred" }),
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::to_bytes;

  #[actix_rt::test]
  async fn not_found_renders_json_error() {
    let resp = AppError::NotFound("Not found".into()).error_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value, json!({ "error": "Not found" }));
  }

  #[actix_rt::test]
  async fn field_errors_are_nested_under_error() {
    let mut fields = FieldErrors::default();
    fields.add("email", "Invalid email");
    let resp = AppError::InvalidInput(fields).error_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["error"]["fieldErrors"]["email"][0], "Invalid email");
  }

  #[test]
  fn status_codes_follow_variants() {
    assert_eq!(AppError::PaymentVerification.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
    assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
    assert_eq!(AppError::Gateway("x".into()).status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(AppError::Sqlx(sqlx::Error::RowNotFound).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn anyhow_wrapping_sqlx_keeps_database_variant() {
    let err: AppError = anyhow::Error::from(sqlx::Error::PoolTimedOut).into();
    assert!(matches!(err, AppError::Sqlx(sqlx::Error::PoolTimedOut)));
  }
}
