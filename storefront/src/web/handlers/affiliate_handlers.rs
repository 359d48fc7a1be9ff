// storefront/src/web/handlers/affiliate_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::{affiliate_service, auth_service, settings_service};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ClickPayload {
  #[serde(default)]
  pub promo_code: Option<String>,
}

#[instrument(name = "handler::register_affiliate", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn register_affiliate_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user = auth_service::find_user_by_id(&app_state.db_pool, auth_user.user_id)
    .await?
    .ok_or_else(|| AppError::Auth("Unauthorized".to_string()))?;
  let rate = settings_service::load(&app_state.db_pool).await?.affiliate_commission_rate();

  let affiliate = affiliate_service::register(&app_state.db_pool, user.id, user.name.as_deref(), rate).await?;
  let referral_link = affiliate_service::referral_link(&app_state.config.app_base_url, &affiliate.promo_code);
  Ok(HttpResponse::Ok().json(json!({
    "affiliate": {
      "id": affiliate.id,
      "promoCode": affiliate.promo_code,
      "totalEarnings": affiliate.total_earnings,
      "commissionRate": affiliate.commission_rate,
      "referralLink": referral_link,
    }
  })))
}

#[instrument(name = "handler::get_affiliate", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_affiliate_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let account =
    affiliate_service::account_overview(&app_state.db_pool, auth_user.user_id, &app_state.config.app_base_url, Utc::now())
      .await?;
  Ok(HttpResponse::Ok().json(json!({ "affiliate": account })))
}

#[instrument(name = "handler::affiliate_click", skip(app_state, req_payload))]
pub async fn record_click_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ClickPayload>,
) -> Result<HttpResponse, AppError> {
  let click = affiliate_service::record_click(&app_state.db_pool, req_payload.promo_code.as_deref()).await?;
  info!(affiliate_id = %click.affiliate_id, "Referral click recorded.");
  Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
