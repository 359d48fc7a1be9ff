// storefront/src/state.rs

use bazaar_flow::Flows;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult};
use crate::pipelines;
use crate::services::mailer::{LogMailer, Mailer};
use crate::services::payment_gateway::{build_gateway, PaymentGateway};
use crate::services::report_service::ReportCache;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub flows: Arc<Flows<AppError>>,
  pub config: Arc<AppConfig>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub mailer: Arc<dyn Mailer>,
  pub report_cache: Arc<ReportCache>,
}

impl AppState {
  /// Wires the gateway, mailer and report cache from `config` and registers
  /// every pipeline on a fresh registry.
  pub fn new(db_pool: PgPool, config: Arc<AppConfig>) -> AppResult<Self> {
    let gateway = build_gateway(&config)?;
    let app_state = Self {
      db_pool,
      flows: Arc::new(Flows::new()),
      report_cache: Arc::new(ReportCache::new(config.report_cache_ttl)),
      mailer: Arc::new(LogMailer::new()),
      gateway,
      config,
    };
    pipelines::register_all_pipelines(&app_state.flows, &app_state);
    Ok(app_state)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipelines::contexts::{CheckoutCtxData, PaymentVerificationCtxData, PayoutCtxData, SignupCtxData};
  use sqlx::postgres::PgPoolOptions;

  #[tokio::test]
  async fn new_state_registers_every_pipeline() {
    let config = AppConfig::for_tests();
    let pool = PgPoolOptions::new().connect_lazy(&config.database_url).unwrap();
    let state = AppState::new(pool, Arc::new(config)).unwrap();

    assert_eq!(state.flows.len(), 6);
    assert!(state.flows.contains::<SignupCtxData>());
    assert!(state.flows.contains::<CheckoutCtxData>());
    assert!(state.flows.contains::<PaymentVerificationCtxData>());
    assert!(state.flows.contains::<PayoutCtxData>());
    assert_eq!(state.gateway.name(), "mock");
  }
}
