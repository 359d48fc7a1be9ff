// storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const PRODUCT_COLUMNS: &str =
  "id, slug, name, description, price, stock, category, tags, images, affiliate_commission, created_at, updated_at";

/// Prices are paise.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub slug: String,
  pub name: String,
  pub description: String,
  pub price: i64,
  pub stock: i32,
  pub category: Option<String>,
  pub tags: Json<Vec<String>>,
  pub images: Json<Vec<String>>,
  pub affiliate_commission: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
