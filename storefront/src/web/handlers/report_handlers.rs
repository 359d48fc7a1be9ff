// storefront/src/web/handlers/report_handlers.rs

use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::report_service::{self, CACHE_CONTROL};
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug, Default)]
pub struct ReportQuery {
  pub days: Option<i64>,
  #[serde(rename = "type")]
  pub report_type: Option<String>,
}

#[instrument(name = "handler::reports", skip(app_state, query, admin), fields(admin_id = %admin.user_id))]
pub async fn reports_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ReportQuery>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let days = report_service::validate_days(query.days)?;
  let report = report_service::cached_report(&app_state.db_pool, &app_state.report_cache, days).await?;
  Ok(
    HttpResponse::Ok()
      .insert_header((header::CACHE_CONTROL, CACHE_CONTROL))
      .json(&*report),
  )
}

#[instrument(name = "handler::export_report", skip(app_state, query, admin), fields(admin_id = %admin.user_id))]
pub async fn export_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ReportQuery>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let days = report_service::validate_days(query.days)?;
  let report_type = report_service::export_type(query.report_type.as_deref());
  let report = report_service::cached_report(&app_state.db_pool, &app_state.report_cache, days).await?;

  let csv = report_service::to_csv(&report_service::export_rows(&report_type, days, &report));
  let filename = report_service::export_filename(&report_type, Utc::now());
  info!(%filename, bytes = csv.len(), "Report exported.");
  Ok(
    HttpResponse::Ok()
      .content_type("text/csv; charset=utf-8")
      .insert_header(ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(filename)],
      })
      .insert_header((header::CACHE_CONTROL, CACHE_CONTROL))
      .body(csv),
  )
}

#[instrument(name = "handler::clear_report_cache", skip(app_state, admin), fields(admin_id = %admin.user_id))]
pub async fn clear_cache_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let cleared = app_state.report_cache.clear();
  info!(cleared, "Report cache cleared.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "cleared": cleared })))
}
