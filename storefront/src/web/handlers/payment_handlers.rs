// storefront/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use bazaar_flow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::{CheckoutCtxData, PaymentVerificationCtxData};
use crate::services::payment_gateway::CURRENCY;
use crate::services::validation::{LineItemInput, ShippingAddress};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
  #[serde(default)]
  pub items: Vec<LineItemInput>,
  pub shipping_address: ShippingAddress,
  /// Paise, as shown to the customer.
  pub total: i64,
  #[serde(default)]
  pub promo_code: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct VerifyPayload {
  pub razorpay_order_id: String,
  pub razorpay_payment_id: String,
  pub razorpay_signature: String,
  #[serde(rename = "orderId")]
  pub order_id: Uuid,
}

#[instrument(
  name = "handler::create_payment_order",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, total = req_payload.total)
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CreateOrderPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(CheckoutCtxData {
    app_state: app_state.get_ref().clone(),
    authenticated_user_id: auth_user.user_id,
    items: payload.items,
    shipping_address: payload.shipping_address,
    claimed_total: payload.total,
    promo_code: payload.promo_code,
    priced_lines: Vec::new(),
    computed_total: 0,
    affiliate: None,
    gateway_order: None,
    order_id: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (order_id, gateway_order) = {
        let guard = ctx_data.read();
        (guard.order_id, guard.gateway_order.clone())
      };
      let (Some(order_id), Some(gateway_order)) = (order_id, gateway_order) else {
        return Err(AppError::Internal("Checkout completed without an order".to_string()));
      };
      info!(%order_id, gateway_order_id = %gateway_order.id, "Checkout ready for payment.");
      Ok(HttpResponse::Ok().json(json!({
        "orderId": order_id,
        "razorpayOrderId": gateway_order.id,
        "amount": gateway_order.amount,
        "currency": CURRENCY,
        "key": app_state.gateway.key_id(),
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!(user_id = %auth_user.user_id, "Checkout pipeline was stopped by a handler.");
      Err(AppError::Internal("Checkout was halted by an internal step.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(
  name = "handler::verify_payment",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, order_id = %req_payload.order_id)
)]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<VerifyPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let order_id = payload.order_id;
  let ctx_data = ContextData::new(PaymentVerificationCtxData {
    app_state: app_state.get_ref().clone(),
    authenticated_user_id: auth_user.user_id,
    order_id,
    razorpay_order_id: payload.razorpay_order_id,
    razorpay_payment_id: payload.razorpay_payment_id,
    razorpay_signature: payload.razorpay_signature,
    order: None,
    confirmation_sent: false,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let confirmation_sent = ctx_data.read().confirmation_sent;
      info!(%order_id, confirmation_sent, "Payment verified.");
      Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Payment verified and order confirmed",
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!(%order_id, "Payment verification pipeline was stopped by a handler.");
      Err(AppError::PaymentVerification)
    }
    Err(app_err) => Err(app_err),
  }
}
