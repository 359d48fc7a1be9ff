// storefront/src/services/catalog_service.rs

//! Product catalog: lookups, faceted search and the admin write paths.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{is_foreign_key_violation, is_unique_violation, AppError, Result as AppResult};
use crate::models::product::PRODUCT_COLUMNS;
use crate::models::Product;
use crate::services::validation::{is_http_url, is_valid_slug, FieldErrors};

pub const DEFAULT_PAGE_SIZE: i64 = 12;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE: i64 = 10_000;
/// Whole rupees; keeps paise totals far from `i64` limits.
pub const MAX_PRICE_RUPEES: i64 = 10_000_000;

fn not_found() -> AppError {
  AppError::NotFound("Not found".to_string())
}

pub async fn list_all(pool: &PgPool) -> AppResult<Vec<Product>> {
  let sql = format!("SELECT {} FROM products ORDER BY created_at DESC", PRODUCT_COLUMNS);
  Ok(sqlx::query_as::<_, Product>(&sql).fetch_all(pool).await?)
}

pub async fn find_by_id(pool: &PgPool, product_id: Uuid) -> AppResult<Option<Product>> {
  let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
  Ok(sqlx::query_as::<_, Product>(&sql).bind(product_id).fetch_optional(pool).await?)
}

pub async fn get_by_id(pool: &PgPool, product_id: Uuid) -> AppResult<Product> {
  find_by_id(pool, product_id).await?.ok_or_else(not_found)
}

pub async fn get_by_slug(pool: &PgPool, slug: &str) -> AppResult<Product> {
  let sql = format!("SELECT {} FROM products WHERE slug = $1", PRODUCT_COLUMNS);
  sqlx::query_as::<_, Product>(&sql)
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or_else(not_found)
}

pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> AppResult<Vec<Product>> {
  let sql = format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS);
  Ok(sqlx::query_as::<_, Product>(&sql).bind(ids).fetch_all(pool).await?)
}

// --- Search ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
  Price,
  Name,
  Stock,
  CreatedAt,
}

impl SortKey {
  /// Unknown keys sort by creation time.
  pub fn parse(raw: Option<&str>) -> Self {
    match raw.unwrap_or_default() {
      "price" => SortKey::Price,
      "name" => SortKey::Name,
      "stock" => SortKey::Stock,
      _ => SortKey::CreatedAt,
    }
  }

  fn column(self) -> &'static str {
    match self {
      SortKey::Price => "price",
      SortKey::Name => "name",
      SortKey::Stock => "stock",
      SortKey::CreatedAt => "created_at",
    }
  }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
  pub q: Option<String>,
  pub category: Option<String>,
  pub min_price: Option<i64>,
  pub max_price: Option<i64>,
  pub sort_by: Option<String>,
  pub sort_order: Option<String>,
  pub page: Option<i64>,
  pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
  pub pattern: Option<String>,
  pub category: Option<String>,
  pub min_paise: Option<i64>,
  pub max_paise: Option<i64>,
  pub sort: SortKey,
  pub descending: bool,
  pub page: i64,
  pub limit: i64,
}

/// `%term%` with LIKE wildcards in the term escaped.
pub fn like_pattern(term: &str) -> String {
  let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
  format!("%{}%", escaped)
}

impl SearchParams {
  pub fn normalize(&self) -> SearchQuery {
    let pattern = self
      .q
      .as_deref()
      .map(str::trim)
      .filter(|q| !q.is_empty())
      .map(like_pattern);
    let category = self
      .category
      .as_deref()
      .map(str::trim)
      .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
      .map(str::to_string);
    SearchQuery {
      pattern,
      category,
      min_paise: self.min_price.map(|r| r.saturating_mul(100)),
      max_paise: self.max_price.map(|r| r.saturating_mul(100)),
      sort: SortKey::parse(self.sort_by.as_deref()),
      descending: !matches!(self.sort_order.as_deref(), Some("asc")),
      page: self.page.unwrap_or(1).clamp(1, MAX_PAGE),
      limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
  pub page: i64,
  pub limit: i64,
  pub total: i64,
  pub pages: i64,
}

impl Pagination {
  pub fn new(page: i64, limit: i64, total: i64) -> Self {
    let pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
    Self { page, limit, total, pages }
  }

  pub fn offset(&self) -> i64 {
    self.page.saturating_sub(1).saturating_mul(self.limit)
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryFacet {
  pub name: String,
  pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceRange {
  pub min: i64,
  pub max: i64,
}

impl PriceRange {
  /// Whole rupees: the floor of the cheapest and the ceiling of the dearest.
  pub fn from_paise(min: Option<i64>, max: Option<i64>) -> Self {
    Self {
      min: min.map_or(0, |p| p.div_euclid(100)),
      max: max.map_or(0, |p| (p + 99).div_euclid(100)),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
  pub categories: Vec<CategoryFacet>,
  pub price_range: PriceRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
  pub products: Vec<Product>,
  pub pagination: Pagination,
  pub filters: SearchFilters,
}

const SEARCH_WHERE: &str = "stock > 0 \
  AND ($1::TEXT IS NULL OR name ILIKE $1 OR description ILIKE $1 OR COALESCE(category, '') ILIKE $1) \
  AND ($2::TEXT IS NULL OR category = $2) \
  AND ($3::BIGINT IS NULL OR price >= $3) \
  AND ($4::BIGINT IS NULL OR price <= $4)";

#[instrument(name = "catalog_service::search", skip(pool))]
pub async fn search(pool: &PgPool, query: &SearchQuery) -> AppResult<SearchResults> {
  let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {}", SEARCH_WHERE))
    .bind(&query.pattern)
    .bind(&query.category)
    .bind(query.min_paise)
    .bind(query.max_paise)
    .fetch_one(pool)
    .await?;
  let pagination = Pagination::new(query.page, query.limit, total);

  let sql = format!(
    "SELECT {} FROM products WHERE {} ORDER BY {} {}, id LIMIT $5 OFFSET $6",
    PRODUCT_COLUMNS,
    SEARCH_WHERE,
    query.sort.column(),
    if query.descending { "DESC" } else { "ASC" }
  );
  let products = sqlx::query_as::<_, Product>(&sql)
    .bind(&query.pattern)
    .bind(&query.category)
    .bind(query.min_paise)
    .bind(query.max_paise)
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

  let categories = sqlx::query_as::<_, CategoryFacet>(
    "SELECT category AS name, COUNT(*) AS count FROM products \
     WHERE stock > 0 AND category IS NOT NULL GROUP BY category ORDER BY category",
  )
  .fetch_all(pool)
  .await?;
  let (min, max): (Option<i64>, Option<i64>) =
    sqlx::query_as("SELECT MIN(price), MAX(price) FROM products WHERE stock > 0")
      .fetch_one(pool)
      .await?;

  Ok(SearchResults {
    products,
    pagination,
    filters: SearchFilters {
      categories,
      price_range: PriceRange::from_paise(min, max),
    },
  })
}

// --- Admin writes ---

/// Admin product payload. `price` is in whole rupees.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
  pub name: String,
  pub slug: String,
  pub description: String,
  pub price: f64,
  pub stock: i32,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub images: Vec<String>,
  #[serde(default)]
  pub affiliate_commission: i32,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
  pub name: Option<String>,
  pub slug: Option<String>,
  pub description: Option<String>,
  pub price: Option<f64>,
  pub stock: Option<i32>,
  pub category: Option<String>,
  pub tags: Option<Vec<String>>,
  pub images: Option<Vec<String>>,
  pub affiliate_commission: Option<i32>,
}

impl ProductInput {
  pub fn validate(&self) -> AppResult<()> {
    let mut errors = FieldErrors::default();
    if self.name.trim().chars().count() < 2 {
      errors.add("name", "Must be at least 2 characters");
    }
    if self.slug.chars().count() < 2 {
      errors.add("slug", "Must be at least 2 characters");
    } else if !is_valid_slug(&self.slug) {
      errors.add("slug", "Only letters, numbers and hyphens are allowed");
    }
    if self.description.trim().chars().count() < 10 {
      errors.add("description", "Must be at least 10 characters");
    }
    if !(self.price > 0.0 && self.price.fract() == 0.0) {
      errors.add("price", "Price must be a positive whole number of rupees");
    } else if self.price > MAX_PRICE_RUPEES as f64 {
      errors.add("price", format!("Price cannot exceed {} rupees", MAX_PRICE_RUPEES));
    }
    if self.stock < 0 {
      errors.add("stock", "Stock cannot be negative");
    }
    for (idx, image) in self.images.iter().enumerate() {
      if !is_http_url(image) {
        errors.add(&format!("images.{}", idx), "Invalid URL");
      }
    }
    if !(0..=100).contains(&self.affiliate_commission) {
      errors.add("affiliateCommission", "Must be between 0 and 100");
    }
    errors.into_result()
  }

  pub fn price_paise(&self) -> AppResult<i64> {
    (self.price as i64).checked_mul(100).ok_or_else(|| {
      let mut errors = FieldErrors::default();
      errors.add("price", "Price is too large");
      AppError::InvalidInput(errors)
    })
  }

  fn category(&self) -> Option<String> {
    self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()).map(str::to_string)
  }

  /// Stored product merged with a patch, back in input units.
  pub fn from_patch(existing: &Product, patch: ProductPatch) -> Self {
    Self {
      name: patch.name.unwrap_or_else(|| existing.name.clone()),
      slug: patch.slug.unwrap_or_else(|| existing.slug.clone()),
      description: patch.description.unwrap_or_else(|| existing.description.clone()),
      price: patch.price.unwrap_or((existing.price / 100) as f64),
      stock: patch.stock.unwrap_or(existing.stock),
      category: patch.category.or_else(|| existing.category.clone()),
      tags: patch.tags.unwrap_or_else(|| existing.tags.0.clone()),
      images: patch.images.unwrap_or_else(|| existing.images.0.clone()),
      affiliate_commission: patch.affiliate_commission.unwrap_or(existing.affiliate_commission),
    }
  }
}

fn slug_conflict(err: sqlx::Error) -> AppError {
  if is_unique_violation(&err) {
    AppError::Conflict("A product with this slug already exists".to_string())
  } else {
    AppError::Sqlx(err)
  }
}

#[instrument(name = "catalog_service::create", skip(pool, input), fields(slug = %input.slug))]
pub async fn create(pool: &PgPool, input: &ProductInput) -> AppResult<Product> {
  input.validate()?;
  let sql = format!(
    "INSERT INTO products (id, slug, name, description, price, stock, category, tags, images, affiliate_commission) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
    PRODUCT_COLUMNS
  );
  let product = sqlx::query_as::<_, Product>(&sql)
    .bind(Uuid::new_v4())
    .bind(&input.slug)
    .bind(input.name.trim())
    .bind(input.description.trim())
    .bind(input.price_paise()?)
    .bind(input.stock)
    .bind(input.category())
    .bind(Json(&input.tags))
    .bind(Json(&input.images))
    .bind(input.affiliate_commission)
    .fetch_one(pool)
    .await
    .map_err(slug_conflict)?;
  info!(product_id = %product.id, "Product created.");
  Ok(product)
}

#[instrument(name = "catalog_service::update", skip(pool, patch))]
pub async fn update(pool: &PgPool, product_id: Uuid, patch: ProductPatch) -> AppResult<Product> {
  let existing = get_by_id(pool, product_id).await?;
  let merged = ProductInput::from_patch(&existing, patch);
  merged.validate()?;

  let sql = format!(
    "UPDATE products SET slug = $2, name = $3, description = $4, price = $5, stock = $6, category = $7, \
       tags = $8, images = $9, affiliate_commission = $10, updated_at = now() \
     WHERE id = $1 RETURNING {}",
    PRODUCT_COLUMNS
  );
  sqlx::query_as::<_, Product>(&sql)
    .bind(product_id)
    .bind(&merged.slug)
    .bind(merged.name.trim())
    .bind(merged.description.trim())
    .bind(merged.price_paise()?)
    .bind(merged.stock)
    .bind(merged.category())
    .bind(Json(&merged.tags))
    .bind(Json(&merged.images))
    .bind(merged.affiliate_commission)
    .fetch_optional(pool)
    .await
    .map_err(slug_conflict)?
    .ok_or_else(not_found)
}

#[instrument(name = "catalog_service::delete", skip(pool))]
pub async fn delete(pool: &PgPool, product_id: Uuid) -> AppResult<()> {
  let result = sqlx::query("DELETE FROM products WHERE id = $1")
    .bind(product_id)
    .execute(pool)
    .await
    .map_err(|err| {
      if is_foreign_key_violation(&err) {
        AppError::Conflict("Product is referenced by existing orders".to_string())
      } else {
        AppError::Sqlx(err)
      }
    })?;
  if result.rows_affected() == 0 {
    return Err(not_found());
  }
  info!(%product_id, "Product deleted.");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn input() -> ProductInput {
    ProductInput {
      name: "Black Pepper".into(),
      slug: "black-pepper".into(),
      description: "Bold Malabar peppercorns, sun dried.".into(),
      price: 299.0,
      stock: 40,
      category: Some("Whole Spices".into()),
      tags: vec!["pepper".into()],
      images: vec!["https://cdn.example.com/pepper.jpg".into()],
      affiliate_commission: 5,
    }
  }

  #[test]
  fn valid_input_stores_paise() {
    let product = input();
    assert!(product.validate().is_ok());
    assert_eq!(product.price_paise().unwrap(), 29900);
  }

  #[test]
  fn invalid_fields_are_each_reported() {
    let mut bad = input();
    bad.slug = "black pepper".into();
    bad.description = "short".into();
    bad.price = 299.5;
    bad.stock = -1;
    bad.images = vec!["ftp://x".into()];
    bad.affiliate_commission = 101;
    match bad.validate() {
      Err(AppError::InvalidInput(fields)) => {
        for key in ["slug", "description", "price", "stock", "images.0", "affiliateCommission"] {
          assert!(fields.get(key).is_some(), "missing error for {}", key);
        }
        assert!(fields.get("name").is_none());
      }
      other => panic!("expected field errors, got {:?}", other),
    }
  }

  #[test]
  fn oversized_prices_are_rejected_not_overflowed() {
    let mut pricey = input();
    pricey.price = (i64::MAX / 100) as f64;
    match pricey.validate() {
      Err(AppError::InvalidInput(fields)) => assert!(fields.get("price").is_some()),
      other => panic!("expected a price error, got {:?}", other),
    }
    assert!(matches!(pricey.price_paise(), Err(AppError::InvalidInput(_))));

    pricey.price = MAX_PRICE_RUPEES as f64;
    assert!(pricey.validate().is_ok());
    assert_eq!(pricey.price_paise().unwrap(), MAX_PRICE_RUPEES * 100);
  }

  #[test]
  fn search_params_normalize() {
    let query = SearchParams {
      q: Some(" 50%_off ".into()),
      category: Some("all".into()),
      min_price: Some(100),
      sort_by: Some("bogus".into()),
      limit: Some(1000),
      page: Some(0),
      ..Default::default()
    }
    .normalize();
    assert_eq!(query.pattern.as_deref(), Some("%50\\%\\_off%"));
    assert_eq!(query.category, None);
    assert_eq!(query.min_paise, Some(10000));
    assert_eq!(query.max_paise, None);
    assert_eq!(query.sort, SortKey::CreatedAt);
    assert!(query.descending);
    assert_eq!((query.page, query.limit), (1, MAX_PAGE_SIZE));

    let asc = SearchParams {
      sort_by: Some("price".into()),
      sort_order: Some("asc".into()),
      category: Some("Powders".into()),
      ..Default::default()
    }
    .normalize();
    assert_eq!(asc.sort, SortKey::Price);
    assert!(!asc.descending);
    assert_eq!(asc.category.as_deref(), Some("Powders"));
    assert_eq!(asc.limit, DEFAULT_PAGE_SIZE);
  }

  #[test]
  fn pagination_rounds_pages_up() {
    let p = Pagination::new(2, 12, 25);
    assert_eq!(p.pages, 3);
    assert_eq!(p.offset(), 12);
    assert_eq!(Pagination::new(1, 12, 0).pages, 0);
    assert_eq!(Pagination::new(1, 12, 24).pages, 2);
  }

  #[test]
  fn huge_pages_are_capped() {
    let query = SearchParams {
      page: Some(i64::MAX),
      ..Default::default()
    }
    .normalize();
    assert_eq!(query.page, MAX_PAGE);
    assert_eq!(Pagination::new(i64::MAX, 100, 5).offset(), i64::MAX);
  }

  #[test]
  fn price_range_in_whole_rupees() {
    assert_eq!(PriceRange::from_paise(Some(19950), Some(29901)), PriceRange { min: 199, max: 300 });
    assert_eq!(PriceRange::from_paise(Some(20000), Some(30000)), PriceRange { min: 200, max: 300 });
    assert_eq!(PriceRange::from_paise(None, None), PriceRange { min: 0, max: 0 });
  }
}
