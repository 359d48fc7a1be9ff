// storefront/src/services/wishlist_service.rs

use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::product::PRODUCT_COLUMNS;
use crate::models::Product;
use crate::services::catalog_service;

pub async fn list(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<Product>> {
  let columns: Vec<String> = PRODUCT_COLUMNS.split(", ").map(|c| format!("p.{}", c)).collect();
  let sql = format!(
    "SELECT {} FROM wishlist_items w JOIN products p ON p.id = w.product_id \
     WHERE w.user_id = $1 ORDER BY w.created_at DESC",
    columns.join(", ")
  );
  Ok(sqlx::query_as::<_, Product>(&sql).bind(user_id).fetch_all(pool).await?)
}

/// Adding a product that is already listed is a no-op.
#[instrument(name = "wishlist_service::add", skip(pool))]
pub async fn add(pool: &PgPool, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
  if catalog_service::find_by_id(pool, product_id).await?.is_none() {
    return Err(AppError::NotFound("Product not found".to_string()));
  }
  sqlx::query("INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;
  Ok(())
}

#[instrument(name = "wishlist_service::remove", skip(pool))]
pub async fn remove(pool: &PgPool, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
  sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;
  Ok(())
}
