// storefront/src/services/affiliate_service.rs

//! Affiliate accounts, referral clicks and commission figures.
//!
//! Commission is always derived from order rows: `floor(sum * rate / 100)`
//! over orders in a paid status. `affiliates.total_earnings` only records
//! what has actually been paid out.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Affiliate, AffiliateClick, AffiliatePayout, OrderStatus};
use crate::services::periods;

const AFFILIATE_COLUMNS: &str = "id, user_id, promo_code, commission_rate, total_earnings, created_at";
const FALLBACK_PROMO_BASE: &str = "SPICE";

pub fn commission_for(order_total_sum: i64, commission_rate: i32) -> i64 {
  if order_total_sum <= 0 || commission_rate <= 0 {
    return 0;
  }
  (i128::from(order_total_sum) * i128::from(commission_rate) / 100) as i64
}

/// The orders a payout settles and the commission owed on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutPlan {
  pub order_ids: Vec<Uuid>,
  pub amount: i64,
}

/// `unpaid` is `(order_id, total)` as returned by [`unpaid_orders`].
pub fn plan_payout(unpaid: &[(Uuid, i64)], commission_rate: i32) -> AppResult<PayoutPlan> {
  let order_sum: i128 = unpaid.iter().map(|(_, total)| i128::from(*total)).sum();
  let order_sum = i64::try_from(order_sum).unwrap_or(i64::MAX);
  let amount = commission_for(order_sum, commission_rate);
  if amount <= 0 {
    return Err(AppError::Validation("No earnings to pay out".to_string()));
  }
  Ok(PayoutPlan {
    order_ids: unpaid.iter().map(|(id, _)| *id).collect(),
    amount,
  })
}

/// Name without whitespace, upper-cased, first six characters.
pub fn promo_code_base(name: Option<&str>) -> String {
  let base: String = name
    .unwrap_or_default()
    .chars()
    .filter(|c| !c.is_whitespace())
    .flat_map(char::to_uppercase)
    .take(6)
    .collect();
  if base.is_empty() {
    FALLBACK_PROMO_BASE.to_string()
  } else {
    base
  }
}

/// `base`, then `base1`, `base2`, ...
pub fn promo_code_candidate(base: &str, attempt: u32) -> String {
  if attempt == 0 {
    base.to_string()
  } else {
    format!("{}{}", base, attempt)
  }
}

pub fn referral_link(app_base_url: &str, promo_code: &str) -> String {
  format!("{}/?ref={}", app_base_url.trim_end_matches('/'), promo_code)
}

pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> AppResult<Option<Affiliate>> {
  let sql = format!("SELECT {} FROM affiliates WHERE user_id = $1", AFFILIATE_COLUMNS);
  Ok(sqlx::query_as::<_, Affiliate>(&sql).bind(user_id).fetch_optional(pool).await?)
}

pub async fn find_by_id(pool: &PgPool, affiliate_id: Uuid) -> AppResult<Option<Affiliate>> {
  let sql = format!("SELECT {} FROM affiliates WHERE id = $1", AFFILIATE_COLUMNS);
  Ok(sqlx::query_as::<_, Affiliate>(&sql).bind(affiliate_id).fetch_optional(pool).await?)
}

pub async fn find_by_promo_code(pool: &PgPool, promo_code: &str) -> AppResult<Option<Affiliate>> {
  let sql = format!("SELECT {} FROM affiliates WHERE promo_code = $1", AFFILIATE_COLUMNS);
  Ok(
    sqlx::query_as::<_, Affiliate>(&sql)
      .bind(promo_code.trim())
      .fetch_optional(pool)
      .await?,
  )
}

async fn unique_promo_code(pool: &PgPool, name: Option<&str>) -> AppResult<String> {
  let base = promo_code_base(name);
  let mut attempt = 0;
  loop {
    let candidate = promo_code_candidate(&base, attempt);
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM affiliates WHERE promo_code = $1)")
      .bind(&candidate)
      .fetch_one(pool)
      .await?;
    if !taken {
      return Ok(candidate);
    }
    attempt += 1;
  }
}

#[instrument(name = "affiliate_service::register", skip(pool, user_name))]
pub async fn register(pool: &PgPool, user_id: Uuid, user_name: Option<&str>, commission_rate: i32) -> AppResult<Affiliate> {
  if find_by_user(pool, user_id).await?.is_some() {
    return Err(AppError::Validation("Affiliate account already exists".to_string()));
  }

  let promo_code = unique_promo_code(pool, user_name).await?;
  let sql = format!(
    "INSERT INTO affiliates (id, user_id, promo_code, commission_rate) VALUES ($1, $2, $3, $4) RETURNING {}",
    AFFILIATE_COLUMNS
  );
  let affiliate = sqlx::query_as::<_, Affiliate>(&sql)
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&promo_code)
    .bind(commission_rate)
    .fetch_one(pool)
    .await?;
  info!(affiliate_id = %affiliate.id, %promo_code, "Affiliate registered.");
  Ok(affiliate)
}

#[instrument(name = "affiliate_service::record_click", skip(pool))]
pub async fn record_click(pool: &PgPool, promo_code: Option<&str>) -> AppResult<AffiliateClick> {
  let code = promo_code.map(str::trim).filter(|c| !c.is_empty());
  let Some(code) = code else {
    return Err(AppError::Validation("Promo code required".to_string()));
  };
  let Some(affiliate) = find_by_promo_code(pool, code).await? else {
    warn!(promo_code = %code, "Click for unknown promo code.");
    return Err(AppError::NotFound("Invalid promo code".to_string()));
  };

  let click = sqlx::query_as::<_, AffiliateClick>(
    "INSERT INTO affiliate_clicks (id, affiliate_id) VALUES ($1, $2) RETURNING id, affiliate_id, created_at",
  )
  .bind(Uuid::new_v4())
  .bind(affiliate.id)
  .fetch_one(pool)
  .await?;
  Ok(click)
}

#[derive(Debug, Clone, Default, FromRow)]
struct OrderTotals {
  paid_orders: i64,
  unpaid_total: i64,
}

async fn order_totals(pool: &PgPool, affiliate_id: Uuid) -> AppResult<OrderTotals> {
  let sql = format!(
    "SELECT COUNT(*) AS paid_orders, \
       COALESCE(SUM(total) FILTER (WHERE NOT paid_out), 0)::BIGINT AS unpaid_total \
     FROM orders WHERE affiliate_id = $1 AND status IN {}",
    OrderStatus::paid_sql_list()
  );
  Ok(sqlx::query_as::<_, OrderTotals>(&sql).bind(affiliate_id).fetch_one(pool).await?)
}

/// Paid orders not yet covered by a payout, as `(id, total)`.
pub async fn unpaid_orders(
  conn: impl sqlx::PgExecutor<'_>,
  affiliate_id: Uuid,
) -> AppResult<Vec<(Uuid, i64)>> {
  let sql = format!(
    "SELECT id, total FROM orders WHERE affiliate_id = $1 AND paid_out = false AND status IN {} ORDER BY created_at",
    OrderStatus::paid_sql_list()
  );
  Ok(sqlx::query_as::<_, (Uuid, i64)>(&sql).bind(affiliate_id).fetch_all(conn).await?)
}

/// Marks `order_ids` as paid out, skipping any that were already flagged or
/// have left a paid status since they were collected. Returns rows flagged.
pub async fn flag_paid_out(conn: &mut PgConnection, order_ids: &[Uuid]) -> AppResult<u64> {
  let sql = format!(
    "UPDATE orders SET paid_out = true, updated_at = NOW() \
     WHERE id = ANY($1) AND paid_out = false AND status IN {}",
    OrderStatus::paid_sql_list()
  );
  let flagged = sqlx::query(&sql).bind(order_ids).execute(conn).await?;
  Ok(flagged.rows_affected())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStats {
  pub total_clicks: i64,
  pub monthly_clicks: i64,
  pub total_earnings: i64,
  pub pending_earnings: i64,
  pub total_orders: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateAccount {
  pub id: Uuid,
  pub promo_code: String,
  pub commission_rate: i32,
  pub total_earnings: i64,
  pub referral_link: String,
  pub created_at: DateTime<Utc>,
  pub clicks: Vec<AffiliateClick>,
  pub stats: AccountStats,
}

#[instrument(name = "affiliate_service::account_overview", skip(pool, app_base_url))]
pub async fn account_overview(pool: &PgPool, user_id: Uuid, app_base_url: &str, now: DateTime<Utc>) -> AppResult<AffiliateAccount> {
  let affiliate = find_by_user(pool, user_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Affiliate account not found".to_string()))?;

  let clicks = sqlx::query_as::<_, AffiliateClick>(
    "SELECT id, affiliate_id, created_at FROM affiliate_clicks WHERE affiliate_id = $1 ORDER BY created_at DESC LIMIT 10",
  )
  .bind(affiliate.id)
  .fetch_all(pool)
  .await?;

  let (total_clicks, monthly_clicks): (i64, i64) = sqlx::query_as(
    "SELECT COUNT(*), COUNT(*) FILTER (WHERE created_at >= $2) FROM affiliate_clicks WHERE affiliate_id = $1",
  )
  .bind(affiliate.id)
  .bind(periods::start_of_month(now))
  .fetch_one(pool)
  .await?;

  let totals = order_totals(pool, affiliate.id).await?;

  Ok(AffiliateAccount {
    id: affiliate.id,
    referral_link: referral_link(app_base_url, &affiliate.promo_code),
    promo_code: affiliate.promo_code,
    commission_rate: affiliate.commission_rate,
    total_earnings: affiliate.total_earnings,
    created_at: affiliate.created_at,
    clicks,
    stats: AccountStats {
      total_clicks,
      monthly_clicks,
      total_earnings: affiliate.total_earnings,
      pending_earnings: commission_for(totals.unpaid_total, affiliate.commission_rate),
      total_orders: totals.paid_orders,
    },
  })
}

#[derive(Debug, Clone, FromRow)]
struct AffiliateSummaryRow {
  id: Uuid,
  user_id: Uuid,
  promo_code: String,
  commission_rate: i32,
  paid_out_total: i64,
  created_at: DateTime<Utc>,
  user_name: Option<String>,
  user_email: String,
  total_clicks: i64,
  paid_orders: i64,
  paid_total: i64,
  unpaid_total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AffiliateUser {
  pub name: Option<String>,
  pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateSummary {
  pub id: Uuid,
  pub user_id: Uuid,
  pub promo_code: String,
  pub commission_rate: i32,
  pub total_earnings: i64,
  pub pending_earnings: i64,
  pub paid_out: i64,
  pub total_clicks: i64,
  pub total_orders: i64,
  pub created_at: DateTime<Utc>,
  pub user: AffiliateUser,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramStats {
  pub total_affiliates: i64,
  pub total_commissions: i64,
  pub total_clicks: i64,
  pub total_orders: i64,
  pub pending_payouts: i64,
}

impl ProgramStats {
  pub fn from_summaries(summaries: &[AffiliateSummary]) -> Self {
    summaries.iter().fold(
      ProgramStats {
        total_affiliates: summaries.len() as i64,
        ..Default::default()
      },
      |mut acc, a| {
        acc.total_commissions += a.total_earnings;
        acc.total_clicks += a.total_clicks;
        acc.total_orders += a.total_orders;
        acc.pending_payouts += a.pending_earnings;
        acc
      },
    )
  }
}

#[instrument(name = "affiliate_service::program_overview", skip(pool))]
pub async fn program_overview(pool: &PgPool) -> AppResult<(Vec<AffiliateSummary>, ProgramStats)> {
  let paid = OrderStatus::paid_sql_list();
  let sql = format!(
    "SELECT a.id, a.user_id, a.promo_code, a.commission_rate, a.total_earnings AS paid_out_total, a.created_at, \
       u.name AS user_name, u.email AS user_email, \
       (SELECT COUNT(*) FROM affiliate_clicks c WHERE c.affiliate_id = a.id) AS total_clicks, \
       (SELECT COUNT(*) FROM orders o WHERE o.affiliate_id = a.id AND o.status IN {paid}) AS paid_orders, \
       (SELECT COALESCE(SUM(o.total), 0)::BIGINT FROM orders o WHERE o.affiliate_id = a.id AND o.status IN {paid}) AS paid_total, \
       (SELECT COALESCE(SUM(o.total), 0)::BIGINT FROM orders o \
          WHERE o.affiliate_id = a.id AND o.status IN {paid} AND NOT o.paid_out) AS unpaid_total \
     FROM affiliates a JOIN users u ON u.id = a.user_id \
     ORDER BY a.created_at DESC",
    paid = paid
  );
  let rows = sqlx::query_as::<_, AffiliateSummaryRow>(&sql).fetch_all(pool).await?;

  let summaries: Vec<AffiliateSummary> = rows
    .into_iter()
    .map(|r| AffiliateSummary {
      id: r.id,
      user_id: r.user_id,
      total_earnings: commission_for(r.paid_total, r.commission_rate),
      pending_earnings: commission_for(r.unpaid_total, r.commission_rate),
      paid_out: r.paid_out_total,
      promo_code: r.promo_code,
      commission_rate: r.commission_rate,
      total_clicks: r.total_clicks,
      total_orders: r.paid_orders,
      created_at: r.created_at,
      user: AffiliateUser {
        name: r.user_name,
        email: r.user_email,
      },
    })
    .collect();
  let stats = ProgramStats::from_summaries(&summaries);
  Ok((summaries, stats))
}

pub async fn payout_history(pool: &PgPool, affiliate_id: Uuid) -> AppResult<Vec<AffiliatePayout>> {
  if find_by_id(pool, affiliate_id).await?.is_none() {
    return Err(AppError::NotFound("Affiliate not found".to_string()));
  }
  Ok(
    sqlx::query_as::<_, AffiliatePayout>(
      "SELECT id, affiliate_id, amount, status, paid_at, created_at FROM affiliate_payouts \
       WHERE affiliate_id = $1 ORDER BY created_at DESC",
    )
    .bind(affiliate_id)
    .fetch_all(pool)
    .await?,
  )
}
