// storefront/src/services/report_service.rs

//! Admin reporting: windowed sales, product, customer and affiliate
//! aggregates, a per-window in-memory cache, and the CSV export.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::OrderStatus;
use crate::services::affiliate_service::commission_for;
use crate::services::currency::format_rupees;
use crate::services::periods;

pub const MAX_REPORT_DAYS: i64 = 365;
pub const CACHE_CONTROL: &str = "private, max-age=60";

pub fn validate_days(days: Option<i64>) -> AppResult<i64> {
  let days = days.unwrap_or(30);
  if (1..=MAX_REPORT_DAYS).contains(&days) {
    Ok(days)
  } else {
    Err(AppError::Validation(format!("days must be between 1 and {}", MAX_REPORT_DAYS)))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
  pub total_revenue: i64,
  pub total_orders: i64,
  pub average_order_value: f64,
  pub revenue_growth: f64,
  pub orders_growth: f64,
}

impl SalesReport {
  pub fn from_windows(revenue: i64, orders: i64, prev_revenue: i64, prev_orders: i64) -> Self {
    Self {
      total_revenue: revenue,
      total_orders: orders,
      average_order_value: if orders > 0 { revenue as f64 / orders as f64 } else { 0.0 },
      revenue_growth: periods::growth_percent(revenue as f64, prev_revenue as f64),
      orders_growth: periods::growth_percent(orders as f64, prev_orders as f64),
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
  pub id: Uuid,
  pub name: String,
  pub total_sold: i64,
  pub revenue: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LowStockProduct {
  pub id: Uuid,
  pub name: String,
  pub stock: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReport {
  pub top_products: Vec<TopProduct>,
  pub low_stock_products: Vec<LowStockProduct>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerReport {
  pub total_customers: i64,
  pub new_customers: i64,
  pub returning_customers: i64,
  pub customer_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopAffiliate {
  pub id: Uuid,
  pub promo_code: String,
  pub earnings: i64,
  pub orders: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateReport {
  pub total_affiliates: i64,
  pub total_commissions: i64,
  pub top_affiliates: Vec<TopAffiliate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyPoint {
  pub month: String,
  pub revenue: i64,
  pub orders: i64,
  pub customers: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
  pub sales_report: SalesReport,
  pub product_report: ProductReport,
  pub customer_report: CustomerReport,
  pub affiliate_report: AffiliateReport,
  pub monthly_data: Vec<MonthlyPoint>,
}

/// Finished reports keyed by window length, each valid for `ttl`.
pub struct ReportCache {
  ttl: std::time::Duration,
  entries: Mutex<HashMap<i64, (Instant, Arc<ReportData>)>>,
}

impl ReportCache {
  pub fn new(ttl: std::time::Duration) -> Self {
    Self {
      ttl,
      entries: Mutex::new(HashMap::new()),
    }
  }

  pub fn get(&self, days: i64, now: Instant) -> Option<Arc<ReportData>> {
    let mut entries = self.entries.lock();
    let (expires, data) = entries.get(&days).map(|(expires, data)| (*expires, Arc::clone(data)))?;
    if expires > now {
      return Some(data);
    }
    entries.remove(&days);
    None
  }

  pub fn insert(&self, days: i64, data: Arc<ReportData>, now: Instant) {
    self.entries.lock().insert(days, (now + self.ttl, data));
  }

  pub fn clear(&self) -> usize {
    let mut entries = self.entries.lock();
    let dropped = entries.len();
    entries.clear();
    dropped
  }
}

/// Serves from `cache` when fresh, otherwise aggregates and stores the result.
pub async fn cached_report(pool: &PgPool, cache: &ReportCache, days: i64) -> AppResult<Arc<ReportData>> {
  if let Some(hit) = cache.get(days, Instant::now()) {
    debug!(days, "Report served from cache.");
    return Ok(hit);
  }
  let report = Arc::new(build_report(pool, days, Utc::now()).await?);
  cache.insert(days, Arc::clone(&report), Instant::now());
  Ok(report)
}

#[derive(Debug, FromRow)]
struct AffiliateWindowRow {
  id: Uuid,
  promo_code: String,
  commission_rate: i32,
  revenue: i64,
  orders: i64,
}

pub fn rank_affiliates(rows: Vec<(Uuid, String, i32, i64, i64)>) -> AffiliateReport {
  let mut ranked: Vec<TopAffiliate> = rows
    .into_iter()
    .map(|(id, promo_code, rate, revenue, orders)| TopAffiliate {
      id,
      promo_code,
      earnings: commission_for(revenue, rate),
      orders,
    })
    .collect();
  let total_affiliates = ranked.len() as i64;
  let total_commissions = ranked.iter().map(|a| a.earnings).sum();
  ranked.sort_by(|a, b| b.earnings.cmp(&a.earnings));
  ranked.truncate(5);
  AffiliateReport {
    total_affiliates,
    total_commissions,
    top_affiliates: ranked,
  }
}

#[instrument(name = "report_service::build_report", skip(pool))]
pub async fn build_report(pool: &PgPool, days: i64, now: DateTime<Utc>) -> AppResult<ReportData> {
  let start = now - Duration::days(days);
  let prev_start = start - Duration::days(days);
  let paid = OrderStatus::paid_sql_list();

  let sales_sql = format!(
    "SELECT COALESCE(SUM(total) FILTER (WHERE created_at >= $1), 0)::BIGINT, \
       COUNT(*) FILTER (WHERE created_at >= $1), \
       COALESCE(SUM(total) FILTER (WHERE created_at < $1), 0)::BIGINT, \
       COUNT(*) FILTER (WHERE created_at < $1) \
     FROM orders WHERE status IN {} AND created_at >= $2",
    paid
  );
  let (revenue, orders, prev_revenue, prev_orders): (i64, i64, i64, i64) = sqlx::query_as(&sales_sql)
    .bind(start)
    .bind(prev_start)
    .fetch_one(pool)
    .await?;

  let top_sql = format!(
    "SELECT oi.product_id AS id, COALESCE(p.name, 'Unknown Product') AS name, \
       SUM(oi.quantity)::BIGINT AS total_sold, SUM(oi.price * oi.quantity)::BIGINT AS revenue \
     FROM order_items oi \
       JOIN orders o ON o.id = oi.order_id \
       LEFT JOIN products p ON p.id = oi.product_id \
     WHERE o.status IN {} AND o.created_at >= $1 \
     GROUP BY oi.product_id, p.name \
     ORDER BY total_sold DESC LIMIT 5",
    paid
  );
  let top_products = sqlx::query_as::<_, TopProduct>(&top_sql).bind(start).fetch_all(pool).await?;

  let low_stock_products = sqlx::query_as::<_, LowStockProduct>(
    "SELECT id, name, stock FROM products WHERE stock < 10 ORDER BY stock ASC LIMIT 10",
  )
  .fetch_all(pool)
  .await?;

  let (total_customers, new_customers, prev_customers): (i64, i64, i64) = sqlx::query_as(
    "SELECT COUNT(*), COUNT(*) FILTER (WHERE created_at >= $1), \
       COUNT(*) FILTER (WHERE created_at >= $2 AND created_at < $1) \
     FROM users WHERE role = 'USER'",
  )
  .bind(start)
  .bind(prev_start)
  .fetch_one(pool)
  .await?;

  let affiliate_sql = format!(
    "SELECT a.id, a.promo_code, a.commission_rate, \
       COALESCE(SUM(o.total), 0)::BIGINT AS revenue, COUNT(o.id) AS orders \
     FROM affiliates a \
       LEFT JOIN orders o ON o.affiliate_id = a.id AND o.status IN {} AND o.created_at >= $1 \
     GROUP BY a.id",
    paid
  );
  let affiliate_rows = sqlx::query_as::<_, AffiliateWindowRow>(&affiliate_sql)
    .bind(start)
    .fetch_all(pool)
    .await?;
  let affiliate_report = rank_affiliates(
    affiliate_rows
      .into_iter()
      .map(|r| (r.id, r.promo_code, r.commission_rate, r.revenue, r.orders))
      .collect(),
  );

  let monthly_data = monthly_series(pool, now).await?;

  Ok(ReportData {
    sales_report: SalesReport::from_windows(revenue, orders, prev_revenue, prev_orders),
    product_report: ProductReport {
      top_products,
      low_stock_products,
    },
    customer_report: CustomerReport {
      total_customers,
      new_customers,
      returning_customers: total_customers - new_customers,
      customer_growth: periods::growth_percent(new_customers as f64, prev_customers as f64),
    },
    affiliate_report,
    monthly_data,
  })
}

/// Last six calendar months, oldest first.
async fn monthly_series(pool: &PgPool, now: DateTime<Utc>) -> AppResult<Vec<MonthlyPoint>> {
  let order_sql = format!(
    "SELECT COALESCE(SUM(total), 0)::BIGINT, COUNT(*) FROM orders \
     WHERE status IN {} AND created_at >= $1 AND created_at < $2",
    OrderStatus::paid_sql_list()
  );
  let mut points = Vec::with_capacity(6);
  for back in (0..6).rev() {
    let (month_start, month_end) = periods::month_window(now, back);
    let (revenue, orders): (i64, i64) = sqlx::query_as(&order_sql)
      .bind(month_start)
      .bind(month_end)
      .fetch_one(pool)
      .await?;
    let customers: i64 = sqlx::query_scalar(
      "SELECT COUNT(*) FROM users WHERE role = 'USER' AND created_at >= $1 AND created_at < $2",
    )
    .bind(month_start)
    .bind(month_end)
    .fetch_one(pool)
    .await?;
    points.push(MonthlyPoint {
      month: periods::month_label(month_start),
      revenue,
      orders,
      customers,
    });
  }
  Ok(points)
}

/// Byte-order mark, every cell quoted, rows joined by `\n`.
pub fn to_csv(rows: &[Vec<String>]) -> String {
  let body: Vec<String> = rows
    .iter()
    .map(|row| {
      row
        .iter()
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
    })
    .collect();
  format!("\u{FEFF}{}", body.join("\n"))
}

fn title_case(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

fn row<const N: usize>(cells: [&str; N]) -> Vec<String> {
  cells.iter().map(|c| c.to_string()).collect()
}

pub const DEFAULT_EXPORT_TYPE: &str = "overview";

/// The requested export type when it is a short `[A-Za-z0-9_-]` token,
/// otherwise [`DEFAULT_EXPORT_TYPE`]. It ends up in a response header.
pub fn export_type(raw: Option<&str>) -> String {
  raw
    .map(str::trim)
    .filter(|t| !t.is_empty() && t.len() <= 32)
    .filter(|t| t.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'))
    .unwrap_or(DEFAULT_EXPORT_TYPE)
    .to_string()
}

pub fn export_rows(report_type: &str, days: i64, report: &ReportData) -> Vec<Vec<String>> {
  let sales = &report.sales_report;
  let mut rows = vec![
    vec![format!("{} Report", title_case(report_type))],
    vec!["Period (days)".to_string(), days.to_string()],
    Vec::new(),
    row(["KPI", "Value"]),
    vec!["Total Revenue (₹)".to_string(), format_rupees(sales.total_revenue)],
    vec!["Total Orders".to_string(), sales.total_orders.to_string()],
    vec![
      "Average Order Value (₹)".to_string(),
      format!("{:.2}", sales.average_order_value / 100.0),
    ],
    vec!["Revenue Growth (%)".to_string(), format!("{:.2}", sales.revenue_growth)],
    vec!["Orders Growth (%)".to_string(), format!("{:.2}", sales.orders_growth)],
    Vec::new(),
    row(["Monthly Trends"]),
    row(["Month", "Revenue (₹)", "Orders", "Customers"]),
  ];
  for m in &report.monthly_data {
    rows.push(vec![
      m.month.clone(),
      format_rupees(m.revenue),
      m.orders.to_string(),
      m.customers.to_string(),
    ]);
  }
  rows.push(Vec::new());
  rows.push(row(["Top Products"]));
  rows.push(row(["Name", "Total Sold", "Revenue (₹)"]));
  for p in &report.product_report.top_products {
    rows.push(vec![p.name.clone(), p.total_sold.to_string(), format_rupees(p.revenue)]);
  }
  rows.push(Vec::new());
  rows.push(row(["Top Affiliates"]));
  rows.push(row(["Promo Code", "Orders", "Earnings (₹)"]));
  for a in &report.affiliate_report.top_affiliates {
    rows.push(vec![a.promo_code.clone(), a.orders.to_string(), format_rupees(a.earnings)]);
  }
  rows
}

pub fn export_filename(report_type: &str, today: DateTime<Utc>) -> String {
  format!("{}-report-{}.csv", report_type, today.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn sample_report() -> ReportData {
    ReportData {
      sales_report: SalesReport::from_windows(150000, 3, 100000, 4),
      product_report: ProductReport {
        top_products: vec![TopProduct {
          id: Uuid::nil(),
          name: "Chettinad \"Special\" Masala".into(),
          total_sold: 7,
          revenue: 209300,
        }],
        low_stock_products: Vec::new(),
      },
      customer_report: CustomerReport {
        total_customers: 10,
        new_customers: 4,
        returning_customers: 6,
        customer_growth: 0.0,
      },
      affiliate_report: rank_affiliates(vec![(Uuid::nil(), "RAJ".into(), 10, 120000, 2)]),
      monthly_data: vec![MonthlyPoint {
        month: "Mar 2026".into(),
        revenue: 150000,
        orders: 3,
        customers: 4,
      }],
    }
  }

  #[test]
  fn sales_math_handles_empty_windows() {
    let report = SalesReport::from_windows(150000, 3, 100000, 4);
    assert_eq!(report.average_order_value, 50000.0);
    assert_eq!(report.revenue_growth, 50.0);
    assert_eq!(report.orders_growth, -25.0);

    let empty = SalesReport::from_windows(0, 0, 0, 0);
    assert_eq!(empty.average_order_value, 0.0);
    assert_eq!(empty.revenue_growth, 0.0);
  }

  #[test]
  fn affiliates_ranked_by_earnings() {
    let report = rank_affiliates(vec![
      (Uuid::new_v4(), "A".into(), 10, 10000, 1),
      (Uuid::new_v4(), "B".into(), 20, 10000, 1),
      (Uuid::new_v4(), "C".into(), 10, 0, 0),
      (Uuid::new_v4(), "D".into(), 5, 99999, 3),
      (Uuid::new_v4(), "E".into(), 10, 30000, 2),
      (Uuid::new_v4(), "F".into(), 10, 500, 1),
    ]);
    assert_eq!(report.total_affiliates, 6);
    assert_eq!(report.total_commissions, 1000 + 2000 + 4999 + 3000 + 50);
    let codes: Vec<&str> = report.top_affiliates.iter().map(|a| a.promo_code.as_str()).collect();
    assert_eq!(codes, ["D", "E", "B", "A", "F"]);
  }

  #[test]
  fn days_are_bounded() {
    assert_eq!(validate_days(None).unwrap(), 30);
    assert_eq!(validate_days(Some(365)).unwrap(), 365);
    assert!(validate_days(Some(0)).is_err());
    assert!(validate_days(Some(366)).is_err());
  }

  #[test]
  fn cache_entries_expire() {
    let cache = ReportCache::new(std::time::Duration::from_secs(60));
    let start = Instant::now();
    cache.insert(30, Arc::new(sample_report()), start);

    assert!(cache.get(30, start + std::time::Duration::from_secs(59)).is_some());
    assert!(cache.get(7, start).is_none());
    assert!(cache.get(30, start + std::time::Duration::from_secs(61)).is_none());
    assert!(cache.get(30, start).is_none());
  }

  #[test]
  fn clearing_drops_every_window() {
    let cache = ReportCache::new(std::time::Duration::from_secs(60));
    let now = Instant::now();
    cache.insert(7, Arc::new(sample_report()), now);
    cache.insert(30, Arc::new(sample_report()), now);
    assert_eq!(cache.clear(), 2);
    assert!(cache.get(7, now).is_none());
  }

  #[test]
  fn csv_quotes_every_cell() {
    let csv = to_csv(&[vec!["a\"b".into(), "c".into()], Vec::new(), vec!["d".into()]]);
    assert_eq!(csv, "\u{FEFF}\"a\"\"b\",\"c\"\n\n\"d\"");
  }

  #[test]
  fn export_has_every_section() {
    let rows = export_rows("overview", 30, &sample_report());
    assert_eq!(rows[0], vec!["Overview Report".to_string()]);
    assert_eq!(rows[1], vec!["Period (days)".to_string(), "30".to_string()]);
    assert!(rows.contains(&vec!["Total Revenue (₹)".to_string(), "1500.00".to_string()]));
    assert!(rows.contains(&vec!["Average Order Value (₹)".to_string(), "500.00".to_string()]));
    assert!(rows.contains(&vec!["Revenue Growth (%)".to_string(), "50.00".to_string()]));
    assert!(rows.contains(&vec!["RAJ".to_string(), "2".to_string(), "120.00".to_string()]));

    let csv = to_csv(&rows);
    assert!(csv.contains("\"Chettinad \"\"Special\"\" Masala\",\"7\",\"2093.00\""));
    assert!(csv.contains("\n\n\"Monthly Trends\""));
  }

  #[test]
  fn export_type_falls_back_on_unsafe_values() {
    assert_eq!(export_type(Some(" sales ")), "sales");
    assert_eq!(export_type(Some("top-products_2")), "top-products_2");
    assert_eq!(export_type(None), DEFAULT_EXPORT_TYPE);
    assert_eq!(export_type(Some("")), DEFAULT_EXPORT_TYPE);
    assert_eq!(export_type(Some("sales\r\nSet-Cookie: x=1")), DEFAULT_EXPORT_TYPE);
    assert_eq!(export_type(Some("../../etc")), DEFAULT_EXPORT_TYPE);
    assert_eq!(export_type(Some(&"a".repeat(33))), DEFAULT_EXPORT_TYPE);
  }

  #[test]
  fn filename_uses_type_and_date() {
    let today = Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap();
    assert_eq!(export_filename("overview", today), "overview-report-2026-03-05.csv");
  }
}
