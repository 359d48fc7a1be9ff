// storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::instrument;

use crate::errors::AppError;
use crate::services::cart_service;
use crate::services::validation::{collect_line_item_errors, FieldErrors, LineItemInput};
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct QuotePayload {
  #[serde(default)]
  pub items: Vec<LineItemInput>,
}

/// Prices a client-held cart against the current catalog.
#[instrument(name = "handler::cart_quote", skip(app_state, req_payload), fields(lines = req_payload.items.len()))]
pub async fn quote_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<QuotePayload>,
) -> Result<HttpResponse, AppError> {
  let mut errors = FieldErrors::default();
  collect_line_item_errors(&req_payload.items, &mut errors);
  errors.into_result()?;

  let quote = cart_service::quote(&app_state.db_pool, &req_payload.items).await?;
  Ok(HttpResponse::Ok().json(quote))
}
