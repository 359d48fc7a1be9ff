// storefront/src/services/order_service.rs

//! Order reads, guest orders and the shared order-insert path.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::order::ORDER_COLUMNS;
use crate::models::{Order, OrderItemDetail, OrderStatus};
use crate::services::cart_service::{self, PricedLine};
use crate::services::catalog_service::{Pagination, MAX_PAGE};
use crate::services::validation::{collect_line_item_errors, FieldErrors, LineItemInput, ShippingAddress};

pub const DEFAULT_ORDER_PAGE_SIZE: i64 = 10;

/// `ALL`, empty or absent means no filter.
pub fn parse_status_filter(raw: Option<&str>) -> AppResult<Option<OrderStatus>> {
  match raw.map(str::trim).filter(|s| !s.is_empty()) {
    None => Ok(None),
    Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
    Some(s) => s.parse::<OrderStatus>().map(Some).map_err(AppError::Validation),
  }
}

pub fn page_window(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
  (
    page.unwrap_or(1).clamp(1, MAX_PAGE),
    limit.unwrap_or(DEFAULT_ORDER_PAGE_SIZE).clamp(1, 100),
  )
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItemDetail>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderRow {
  #[sqlx(flatten)]
  #[serde(flatten)]
  pub order: Order,
  pub customer_name: Option<String>,
  pub customer_email: Option<String>,
}

pub async fn find_order(pool: &PgPool, order_id: Uuid) -> AppResult<Option<Order>> {
  let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
  Ok(sqlx::query_as::<_, Order>(&sql).bind(order_id).fetch_optional(pool).await?)
}

pub async fn items_for_orders(pool: &PgPool, order_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<OrderItemDetail>>> {
  let rows = sqlx::query_as::<_, OrderItemDetail>(
    "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price, \
       p.name AS product_name, p.slug AS product_slug \
     FROM order_items oi JOIN products p ON p.id = oi.product_id \
     WHERE oi.order_id = ANY($1) ORDER BY p.name",
  )
  .bind(order_ids)
  .fetch_all(pool)
  .await?;

  let mut grouped: HashMap<Uuid, Vec<OrderItemDetail>> = HashMap::new();
  for row in rows {
    grouped.entry(row.order_id).or_default().push(row);
  }
  Ok(grouped)
}

async fn attach_items(pool: &PgPool, orders: Vec<Order>) -> AppResult<Vec<OrderWithItems>> {
  let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
  let mut items = items_for_orders(pool, &ids).await?;
  Ok(
    orders
      .into_iter()
      .map(|order| OrderWithItems {
        items: items.remove(&order.id).unwrap_or_default(),
        order,
      })
      .collect(),
  )
}

#[instrument(name = "order_service::list_for_user", skip(pool))]
pub async fn list_for_user(
  pool: &PgPool,
  user_id: Uuid,
  status: Option<OrderStatus>,
  page: i64,
  limit: i64,
) -> AppResult<(Vec<OrderWithItems>, Pagination)> {
  let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1 AND ($2::order_status IS NULL OR status = $2)")
    .bind(user_id)
    .bind(status)
    .fetch_one(pool)
    .await?;
  let pagination = Pagination::new(page, limit, total);

  let sql = format!(
    "SELECT {} FROM orders WHERE user_id = $1 AND ($2::order_status IS NULL OR status = $2) \
     ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    ORDER_COLUMNS
  );
  let orders = sqlx::query_as::<_, Order>(&sql)
    .bind(user_id)
    .bind(status)
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;
  Ok((attach_items(pool, orders).await?, pagination))
}

/// The owner and admins may read an order; anyone else gets 403.
#[instrument(name = "order_service::get_for_viewer", skip(pool))]
pub async fn get_for_viewer(pool: &PgPool, order_id: Uuid, viewer_id: Uuid, viewer_is_admin: bool) -> AppResult<OrderWithItems> {
  let order = find_order(pool, order_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  if !viewer_is_admin && order.user_id != Some(viewer_id) {
    return Err(AppError::Forbidden("Forbidden".to_string()));
  }
  let mut with_items = attach_items(pool, vec![order]).await?;
  with_items
    .pop()
    .ok_or_else(|| AppError::Internal("Order vanished while loading items".to_string()))
}

#[instrument(name = "order_service::admin_list", skip(pool))]
pub async fn admin_list(
  pool: &PgPool,
  status: Option<OrderStatus>,
  page: i64,
  limit: i64,
) -> AppResult<(Vec<AdminOrderRow>, Pagination)> {
  let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)")
    .bind(status)
    .fetch_one(pool)
    .await?;
  let pagination = Pagination::new(page, limit, total);

  let columns: Vec<String> = ORDER_COLUMNS.split(", ").map(|c| format!("o.{}", c)).collect();
  let sql = format!(
    "SELECT {}, u.name AS customer_name, u.email AS customer_email \
     FROM orders o LEFT JOIN users u ON u.id = o.user_id \
     WHERE ($1::order_status IS NULL OR o.status = $1) \
     ORDER BY o.created_at DESC LIMIT $2 OFFSET $3",
    columns.join(", ")
  );
  let rows = sqlx::query_as::<_, AdminOrderRow>(&sql)
    .bind(status)
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;
  Ok((rows, pagination))
}

pub struct NewOrder<'a> {
  pub user_id: Option<Uuid>,
  pub affiliate_id: Option<Uuid>,
  pub total: i64,
  pub shipping_address: &'a ShippingAddress,
  pub razorpay_order_id: Option<&'a str>,
  pub lines: &'a [PricedLine],
}

/// Inserts a PENDING order and its lines. Callers own the transaction.
pub async fn insert_order(conn: &mut PgConnection, new_order: NewOrder<'_>) -> AppResult<Order> {
  let address = serde_json::to_value(new_order.shipping_address)
    .map_err(|e| AppError::Internal(format!("Shipping address not serializable: {}", e)))?;
  let sql = format!(
    "INSERT INTO orders (id, user_id, affiliate_id, status, total, shipping_address, razorpay_order_id) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
    ORDER_COLUMNS
  );
  let order = sqlx::query_as::<_, Order>(&sql)
    .bind(Uuid::new_v4())
    .bind(new_order.user_id)
    .bind(new_order.affiliate_id)
    .bind(OrderStatus::Pending)
    .bind(new_order.total)
    .bind(Json(address))
    .bind(new_order.razorpay_order_id)
    .fetch_one(&mut *conn)
    .await?;

  for line in new_order.lines {
    sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4, $5)")
      .bind(Uuid::new_v4())
      .bind(order.id)
      .bind(line.product_id)
      .bind(line.quantity)
      .bind(line.price)
      .execute(&mut *conn)
      .await?;
  }
  Ok(order)
}

/// Unpaid order without a user. Prices come from the catalog, never the client.
#[instrument(name = "order_service::create_guest", skip_all)]
pub async fn create_guest(pool: &PgPool, items: &[LineItemInput], shipping_address: &ShippingAddress) -> AppResult<Order> {
  let mut errors = FieldErrors::default();
  collect_line_item_errors(items, &mut errors);
  shipping_address.collect_errors(&mut errors);
  errors.into_result()?;

  let quote = cart_service::quote(pool, items)
    .await
    .map_err(|err| match err {
      AppError::Validation(_) => AppError::Validation("Invalid products".to_string()),
      other => other,
    })?;

  let mut tx = pool.begin().await?;
  let order = insert_order(
    &mut tx,
    NewOrder {
      user_id: None,
      affiliate_id: None,
      total: quote.total,
      shipping_address,
      razorpay_order_id: None,
      lines: &quote.items,
    },
  )
  .await?;
  tx.commit().await?;
  info!(order_id = %order.id, total = order.total, "Guest order created.");
  Ok(order)
}
