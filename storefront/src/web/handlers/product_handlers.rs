// storefront/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::catalog_service::{self, ProductInput, ProductPatch, SearchParams};
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = catalog_service::list_all(&app_state.db_pool).await?;
  info!(count = products.len(), "Listed products.");
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let product = catalog_service::get_by_id(&app_state.db_pool, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::get_product_by_slug", skip(app_state, path), fields(slug = %path.as_ref()))]
pub async fn get_product_by_slug_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let product = catalog_service::get_by_slug(&app_state.db_pool, &path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::search_products", skip(app_state, params))]
pub async fn search_products_handler(
  app_state: web::Data<AppState>,
  params: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
  let query = params.normalize();
  let results = catalog_service::search(&app_state.db_pool, &query).await?;
  info!(total = results.pagination.total, page = query.page, "Product search served.");
  Ok(HttpResponse::Ok().json(results))
}

#[instrument(name = "handler::create_product", skip(app_state, req_payload, admin), fields(admin_id = %admin.user_id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ProductInput>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let product = catalog_service::create(&app_state.db_pool, &req_payload).await?;
  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::update_product", skip(app_state, path, req_payload, admin), fields(admin_id = %admin.user_id))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<ProductPatch>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let product = catalog_service::update(&app_state.db_pool, path.into_inner(), req_payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::delete_product", skip(app_state, path, admin), fields(admin_id = %admin.user_id))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  catalog_service::delete(&app_state.db_pool, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}
