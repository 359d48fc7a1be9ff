// storefront/src/services/cart_service.rs

//! Server-side pricing of a client-held cart. Checkout and guest orders
//! price their lines through the same path.

use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::Product;
use crate::services::catalog_service;
use crate::services::validation::LineItemInput;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
  pub product_id: Uuid,
  pub name: String,
  /// Current unit price, paise.
  pub price: i64,
  pub quantity: i32,
  pub line_total: i64,
  pub in_stock: bool,
  #[serde(skip)]
  pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartQuote {
  pub items: Vec<PricedLine>,
  pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingError {
  MissingProduct(Uuid),
  /// A line or the cart total does not fit in paise.
  TooLarge,
}

impl From<PricingError> for AppError {
  fn from(err: PricingError) -> Self {
    match err {
      PricingError::MissingProduct(id) => AppError::Validation(format!("Product {} not found", id)),
      PricingError::TooLarge => AppError::Validation("Order total is too large".to_string()),
    }
  }
}

/// Lines in request order, each priced from `products`.
pub fn price_against(items: &[LineItemInput], products: &[Product]) -> Result<CartQuote, PricingError> {
  let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();
  let mut lines = Vec::with_capacity(items.len());
  let mut total: i64 = 0;
  for item in items {
    let product = by_id
      .get(&item.product_id)
      .ok_or(PricingError::MissingProduct(item.product_id))?;
    let line_total = product
      .price
      .checked_mul(i64::from(item.quantity))
      .ok_or(PricingError::TooLarge)?;
    total = total.checked_add(line_total).ok_or(PricingError::TooLarge)?;
    lines.push(PricedLine {
      product_id: product.id,
      name: product.name.clone(),
      price: product.price,
      quantity: item.quantity,
      line_total,
      in_stock: product.stock >= item.quantity,
      stock: product.stock,
    });
  }
  Ok(CartQuote { items: lines, total })
}

pub async fn quote(pool: &PgPool, items: &[LineItemInput]) -> AppResult<CartQuote> {
  let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
  let products = catalog_service::find_many(pool, &ids).await?;
  Ok(price_against(items, &products)?)
}

/// Accepted difference, in paise, between a client total and the computed one.
pub const TOTAL_TOLERANCE: i64 = 1;

pub fn totals_match(computed: i64, claimed: i64) -> bool {
  computed.abs_diff(claimed) <= TOTAL_TOLERANCE as u64
}
