// storefront/src/web/handlers/health_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{error, instrument};

use crate::db;
use crate::state::AppState;

pub async fn health_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// 503 while the database is unreachable.
#[instrument(name = "handler::readiness", skip(app_state))]
pub async fn readiness_handler(app_state: web::Data<AppState>) -> HttpResponse {
  match db::ping(&app_state.db_pool).await {
    Ok(()) => HttpResponse::Ok().json(json!({ "status": "ok", "database": "ok" })),
    Err(err) => {
      error!(error = %err, "Readiness check failed.");
      HttpResponse::ServiceUnavailable().json(json!({ "status": "unavailable", "database": "unreachable" }))
    }
  }
}
