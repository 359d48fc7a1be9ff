// storefront/src/web/handlers/settings_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::services::settings_service::{self, StoreSettings};
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[instrument(name = "handler::get_settings", skip(app_state, admin), fields(admin_id = %admin.user_id))]
pub async fn get_settings_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let settings = settings_service::load(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(json!({ "settings": settings })))
}

#[instrument(name = "handler::save_settings", skip(app_state, req_payload, admin), fields(admin_id = %admin.user_id))]
pub async fn save_settings_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<StoreSettings>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  settings_service::save(&app_state.db_pool, &req_payload).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Settings updated successfully" })))
}
