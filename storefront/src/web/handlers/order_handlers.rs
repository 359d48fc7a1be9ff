// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use bazaar_flow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{OrderStatus, UserRole};
use crate::pipelines::contexts::OrderStatusCtxData;
use crate::services::validation::{LineItemInput, ShippingAddress};
use crate::services::{auth_service, order_service};
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};

#[derive(Deserialize, Debug, Default)]
pub struct OrderListQuery {
  pub page: Option<i64>,
  pub limit: Option<i64>,
  pub status: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct StatusPayload {
  pub status: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GuestOrderPayload {
  #[serde(default)]
  pub items: Vec<LineItemInput>,
  pub shipping_address: ShippingAddress,
}

#[instrument(name = "handler::list_orders", skip(app_state, query, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<OrderListQuery>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let status = order_service::parse_status_filter(query.status.as_deref())?;
  let (page, limit) = order_service::page_window(query.page, query.limit);
  let (orders, pagination) = order_service::list_for_user(&app_state.db_pool, auth_user.user_id, status, page, limit).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders, "pagination": pagination })))
}

#[instrument(name = "handler::get_order", skip(app_state, path, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let is_admin = auth_service::current_role(&app_state.db_pool, auth_user.user_id).await? == Some(UserRole::Admin);
  let order = order_service::get_for_viewer(&app_state.db_pool, path.into_inner(), auth_user.user_id, is_admin).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::update_order_status", skip(app_state, path, req_payload, admin), fields(admin_id = %admin.user_id))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<StatusPayload>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let requested: OrderStatus = req_payload
    .status
    .as_deref()
    .ok_or_else(|| AppError::Validation("Status is required".to_string()))?
    .parse()
    .map_err(AppError::Validation)?;
  let order_id = path.into_inner();

  let ctx_data = ContextData::new(OrderStatusCtxData {
    app_state: app_state.get_ref().clone(),
    order_id,
    requested,
    current: None,
    updated_order: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let updated = ctx_data.read().updated_order.clone();
      let order = updated.ok_or_else(|| AppError::Internal("Status change completed without an order".to_string()))?;
      info!(%order_id, status = %order.status, "Order status changed by admin.");
      Ok(HttpResponse::Ok().json(json!({ "order": order })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!(%order_id, "Order status pipeline was stopped by a handler.");
      Err(AppError::Internal("Status change was halted by an internal step.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::guest_order", skip(app_state, req_payload), fields(lines = req_payload.items.len()))]
pub async fn guest_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<GuestOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let order = order_service::create_guest(&app_state.db_pool, &req_payload.items, &req_payload.shipping_address).await?;
  Ok(HttpResponse::Created().json(json!({ "order": order })))
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, query, admin), fields(admin_id = %admin.user_id))]
pub async fn admin_list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<OrderListQuery>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let status = order_service::parse_status_filter(query.status.as_deref())?;
  let (page, limit) = order_service::page_window(query.page, query.limit);
  let (orders, pagination) = order_service::admin_list(&app_state.db_pool, status, page, limit).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders, "pagination": pagination })))
}
