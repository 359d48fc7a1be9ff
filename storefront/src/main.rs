// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use spice_bazaar::config::{AppConfig, LogFormat};
use spice_bazaar::db;
use spice_bazaar::state::AppState;
use spice_bazaar::web::configure_app_routes;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = Arc::new(AppConfig::from_env()?);
  init_tracing(app_config.log_format);
  tracing::info!(config = ?app_config, "Starting Spice Bazaar server...");

  let db_pool = db::connect(&app_config).await?;
  db::migrate(&db_pool).await?;

  if app_config.seed_db {
    db::seed::seed(&db_pool, &app_config.seed_admin_password).await?;
  }

  let app_state = AppState::new(db_pool, app_config.clone())?;

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!(%server_address, "Binding HTTP server.");

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;

  tracing::info!("Server stopped.");
  Ok(())
}
