// storefront/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use bazaar_flow::{ContextData, PipelineResult};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::PayoutCtxData;
use crate::services::{admin_service, affiliate_service};
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
pub struct RolePayload {
  pub role: Option<String>,
}

#[instrument(name = "handler::admin_dashboard", skip(app_state, admin), fields(admin_id = %admin.user_id))]
pub async fn dashboard_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let dashboard = admin_service::dashboard(&app_state.db_pool, Utc::now()).await?;
  Ok(HttpResponse::Ok().json(dashboard))
}

#[instrument(name = "handler::admin_users", skip(app_state, admin), fields(admin_id = %admin.user_id))]
pub async fn list_users_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let users = admin_service::list_users(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(json!({ "users": users })))
}

#[instrument(name = "handler::admin_change_role", skip(app_state, path, req_payload, admin), fields(admin_id = %admin.user_id))]
pub async fn change_role_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<RolePayload>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let role = admin_service::parse_role(req_payload.role.as_deref())?;
  let user = admin_service::change_role(&app_state.db_pool, admin.user_id, path.into_inner(), role).await?;
  Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

#[instrument(name = "handler::admin_affiliates", skip(app_state, admin), fields(admin_id = %admin.user_id))]
pub async fn list_affiliates_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let (affiliates, stats) = affiliate_service::program_overview(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(json!({ "affiliates": affiliates, "stats": stats })))
}

#[instrument(name = "handler::admin_payout", skip(app_state, path, admin), fields(admin_id = %admin.user_id))]
pub async fn payout_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let affiliate_id = path.into_inner();
  let ctx_data = ContextData::new(PayoutCtxData {
    app_state: app_state.get_ref().clone(),
    affiliate_id,
    affiliate: None,
    unpaid_orders: Vec::new(),
    order_ids: Vec::new(),
    amount: 0,
    payout_id: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (amount, payout_id) = {
        let guard = ctx_data.read();
        (guard.amount, guard.payout_id)
      };
      info!(%affiliate_id, amount, payout_id = ?payout_id, "Payout completed.");
      Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "amount": amount,
        "message": "Payout processed successfully",
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!(%affiliate_id, "Payout pipeline was stopped by a handler.");
      Err(AppError::Internal("Payout was halted by an internal step.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::admin_payouts", skip(app_state, path, admin), fields(admin_id = %admin.user_id))]
pub async fn payout_history_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let payouts = affiliate_service::payout_history(&app_state.db_pool, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "payouts": payouts })))
}
