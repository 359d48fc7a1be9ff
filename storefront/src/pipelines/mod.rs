// storefront/src/pipelines/mod.rs

//! Multi-step workflows, registered once at start-up and run per request.

use crate::errors::AppError;
use crate::state::AppState;
use bazaar_flow::Flows;

pub mod contexts;

pub mod checkout_pipeline;
pub mod order_status_pipeline;
pub mod payment_pipeline;
pub mod payout_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

pub fn register_all_pipelines(flows: &Flows<AppError>, app_state: &AppState) {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(flows, app_state);
  signin_pipeline::register_signin_pipeline(flows, app_state);
  checkout_pipeline::register_checkout_pipeline(flows, app_state);
  payment_pipeline::register_payment_pipeline(flows, app_state);
  payout_pipeline::register_payout_pipeline(flows, app_state);
  order_status_pipeline::register_order_status_pipeline(flows, app_state);

  tracing::info!(count = flows.len(), "All pipelines registered.");
}
