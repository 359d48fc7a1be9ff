// storefront/src/models/affiliate.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Affiliate {
  pub id: Uuid,
  pub user_id: Uuid,
  pub promo_code: String,
  /// Percent, 0..=100.
  pub commission_rate: i32,
  /// Paise already paid out.
  pub total_earnings: i64,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateClick {
  pub id: Uuid,
  pub affiliate_id: Uuid,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "payout_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
  Pending,
  Completed,
  Failed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AffiliatePayout {
  pub id: Uuid,
  pub affiliate_id: Uuid,
  pub amount: i64,
  pub status: PayoutStatus,
  pub paid_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}
