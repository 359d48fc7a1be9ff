// tests/common/mod.rs
#![allow(dead_code)]

use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App};
use chrono::Utc;
use once_cell::sync::Lazy;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use uuid::Uuid;

use spice_bazaar::config::AppConfig;
use spice_bazaar::services::session_service;
use spice_bazaar::state::AppState;
use spice_bazaar::web::configure_app_routes;

static TRACING: Lazy<()> = Lazy::new(|| {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
});

/// State over a pool that never connects unless a handler reaches the database.
pub fn test_state() -> AppState {
  Lazy::force(&TRACING);
  let config = AppConfig::for_tests();
  let pool = PgPoolOptions::new()
    .max_connections(1)
    .connect_lazy(&config.database_url)
    .expect("lazy pool");
  AppState::new(pool, Arc::new(config)).expect("app state")
}

pub async fn test_app(
  state: AppState,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
  test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await
}

pub fn bearer_for(state: &AppState, user_id: Uuid) -> String {
  let token = session_service::issue_token(&state.config.session_secret, user_id, 1, Utc::now()).expect("token");
  format!("Bearer {}", token)
}

/// Migrated state over `TEST_DATABASE_URL`, or `None` when it is unset.
pub async fn database_state() -> Option<AppState> {
  Lazy::force(&TRACING);
  let database_url = match std::env::var("TEST_DATABASE_URL") {
    Ok(url) => url,
    Err(_) => {
      eprintln!("skipping: TEST_DATABASE_URL not set");
      return None;
    }
  };
  let config = AppConfig {
    database_url,
    database_max_connections: 4,
    ..AppConfig::for_tests()
  };
  let pool = spice_bazaar::db::connect(&config).await.expect("connect test database");
  spice_bazaar::db::migrate(&pool).await.expect("migrate test database");
  Some(AppState::new(pool, Arc::new(config)).expect("app state"))
}
