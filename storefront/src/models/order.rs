// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type as SqlxType};
use std::str::FromStr;
use uuid::Uuid;

pub const ORDER_COLUMNS: &str = "id, user_id, affiliate_id, status, total, shipping_address, razorpay_order_id, payment_id, paid_out, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Packed,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  /// Statuses whose orders count as revenue and toward affiliate commission.
  pub const PAID: [OrderStatus; 4] = [
    OrderStatus::Confirmed,
    OrderStatus::Packed,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "PENDING",
      OrderStatus::Confirmed => "CONFIRMED",
      OrderStatus::Packed => "PACKED",
      OrderStatus::Shipped => "SHIPPED",
      OrderStatus::Delivered => "DELIVERED",
      OrderStatus::Cancelled => "CANCELLED",
    }
  }

  pub fn is_paid(self) -> bool {
    Self::PAID.contains(&self)
  }

  /// `('CONFIRMED', 'PACKED', ...)` for `status IN` filters.
  pub fn paid_sql_list() -> String {
    let quoted: Vec<String> = Self::PAID.iter().map(|s| format!("'{}'", s.as_str())).collect();
    format!("({})", quoted.join(", "))
  }

  fn rank(self) -> Option<u8> {
    match self {
      OrderStatus::Pending => Some(0),
      OrderStatus::Confirmed => Some(1),
      OrderStatus::Packed => Some(2),
      OrderStatus::Shipped => Some(3),
      OrderStatus::Delivered => Some(4),
      OrderStatus::Cancelled => None,
    }
  }

  /// Forward along the fulfilment chain (skipping allowed), or to CANCELLED
  /// before the parcel ships. DELIVERED and CANCELLED are terminal.
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    match (self.rank(), next.rank()) {
      (Some(from), Some(to)) => to > from,
      (Some(from), None) => from <= 2,
      (None, _) => false,
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
  }
}

impl FromStr for OrderStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "PENDING" => Ok(OrderStatus::Pending),
      "CONFIRMED" => Ok(OrderStatus::Confirmed),
      "PACKED" => Ok(OrderStatus::Packed),
      "SHIPPED" => Ok(OrderStatus::Shipped),
      "DELIVERED" => Ok(OrderStatus::Delivered),
      "CANCELLED" => Ok(OrderStatus::Cancelled),
      other => Err(format!("Unknown order status '{}'", other)),
    }
  }
}

impl std::fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: Option<Uuid>,
  pub affiliate_id: Option<Uuid>,
  pub status: OrderStatus,
  /// Paise.
  pub total: i64,
  pub shipping_address: Json<serde_json::Value>,
  pub razorpay_order_id: Option<String>,
  pub payment_id: Option<String>,
  pub paid_out: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::OrderStatus::*;
  use super::*;

  #[test]
  fn fulfilment_moves_forward_only() {
    assert!(Pending.can_transition_to(Confirmed));
    assert!(Confirmed.can_transition_to(Packed));
    assert!(Confirmed.can_transition_to(Shipped));
    assert!(Shipped.can_transition_to(Delivered));
    assert!(!Shipped.can_transition_to(Packed));
    assert!(!Packed.can_transition_to(Packed));
    assert!(!Delivered.can_transition_to(Shipped));
  }

  #[test]
  fn cancellation_only_before_shipping() {
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Confirmed.can_transition_to(Cancelled));
    assert!(Packed.can_transition_to(Cancelled));
    assert!(!Shipped.can_transition_to(Cancelled));
    assert!(!Delivered.can_transition_to(Cancelled));
    assert!(!Cancelled.can_transition_to(Pending));
    assert!(Cancelled.is_terminal());
  }

  #[test]
  fn paid_statuses() {
    assert!(!Pending.is_paid());
    assert!(Packed.is_paid());
    assert!(Delivered.is_paid());
    assert!(!Cancelled.is_paid());
    assert_eq!(OrderStatus::paid_sql_list(), "('CONFIRMED', 'PACKED', 'SHIPPED', 'DELIVERED')");
  }

  #[test]
  fn parses_case_insensitively_and_serializes_upper() {
    assert_eq!("shipped".parse::<OrderStatus>(), Ok(Shipped));
    assert!("LOST".parse::<OrderStatus>().is_err());
    assert_eq!(serde_json::to_value(Confirmed).unwrap(), "CONFIRMED");
  }
}
