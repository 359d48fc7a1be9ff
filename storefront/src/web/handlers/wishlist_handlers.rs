// storefront/src/web/handlers/wishlist_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::wishlist_service;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct WishlistTarget {
  pub product_id: Option<Uuid>,
}

fn required_product(target: &WishlistTarget) -> Result<Uuid, AppError> {
  target
    .product_id
    .ok_or_else(|| AppError::Validation("Product ID is required".to_string()))
}

#[instrument(name = "handler::get_wishlist", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_wishlist_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let wishlist = wishlist_service::list(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "wishlist": wishlist })))
}

#[instrument(name = "handler::add_to_wishlist", skip(app_state, req_payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn add_to_wishlist_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<WishlistTarget>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let product_id = required_product(&req_payload)?;
  wishlist_service::add(&app_state.db_pool, auth_user.user_id, product_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Added to wishlist" })))
}

#[instrument(name = "handler::remove_from_wishlist", skip(app_state, query, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn remove_from_wishlist_handler(
  app_state: web::Data<AppState>,
  query: web::Query<WishlistTarget>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let product_id = required_product(&query)?;
  wishlist_service::remove(&app_state.db_pool, auth_user.user_id, product_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Removed from wishlist" })))
}
