// storefront/src/pipelines/contexts.rs

//! Per-run data for each pipeline. Handlers receive these wrapped in
//! `bazaar_flow::ContextData`.

use uuid::Uuid;

use crate::models::user::PublicUser;
use crate::models::{Affiliate, Order, OrderStatus};
use crate::services::cart_service::PricedLine;
use crate::services::payment_gateway::GatewayOrder;
use crate::services::validation::{LineItemInput, ShippingAddress};
use crate::state::AppState;

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub name: String,
  pub email: String,
  pub password: String,
  pub created_user: Option<PublicUser>,
  pub session_token: Option<String>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub temp_password_hash: Option<String>,
  pub user: Option<PublicUser>,
  pub session_token: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub authenticated_user_id: Uuid,
  pub items: Vec<LineItemInput>,
  pub shipping_address: ShippingAddress,
  pub claimed_total: i64,
  pub promo_code: Option<String>,
  pub priced_lines: Vec<PricedLine>,
  pub computed_total: i64,
  pub affiliate: Option<Affiliate>,
  pub gateway_order: Option<GatewayOrder>,
  pub order_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct PaymentVerificationCtxData {
  pub app_state: AppState,
  pub authenticated_user_id: Uuid,
  pub order_id: Uuid,
  pub razorpay_order_id: String,
  pub razorpay_payment_id: String,
  pub razorpay_signature: String,
  pub order: Option<Order>,
  pub confirmation_sent: bool,
}

#[derive(Clone)]
pub struct PayoutCtxData {
  pub app_state: AppState,
  pub affiliate_id: Uuid,
  pub affiliate: Option<Affiliate>,
  /// `(order_id, total)` collected for this payout.
  pub unpaid_orders: Vec<(Uuid, i64)>,
  pub order_ids: Vec<Uuid>,
  pub amount: i64,
  pub payout_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct OrderStatusCtxData {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub requested: OrderStatus,
  pub current: Option<OrderStatus>,
  pub updated_order: Option<Order>,
}
