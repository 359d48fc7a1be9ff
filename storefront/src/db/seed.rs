// storefront/src/db/seed.rs

//! Development data: one admin account and a starter catalog. Existing rows
//! are never overwritten.

use anyhow::Context;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::UserRole;
use crate::services::auth_service;

pub const ADMIN_EMAIL: &str = "admin@tamilspicebazaar.com";

pub struct SeedProduct {
  pub slug: &'static str,
  pub name: &'static str,
  pub description: &'static str,
  pub price: i64,
  pub stock: i32,
  pub category: &'static str,
  pub tags: &'static [&'static str],
}

pub const SEED_PRODUCTS: [SeedProduct; 3] = [
  SeedProduct {
    slug: "black-pepper",
    name: "Black Pepper",
    description: "Bold, pungent peppercorns from the Western Ghats.",
    price: 29900,
    stock: 50,
    category: "Whole Spices",
    tags: &["pepper", "whole"],
  },
  SeedProduct {
    slug: "turmeric",
    name: "Turmeric Powder",
    description: "Bright Erode turmeric, stone ground in small batches.",
    price: 19900,
    stock: 80,
    category: "Powders",
    tags: &["turmeric", "powder"],
  },
  SeedProduct {
    slug: "chili-powder",
    name: "Chili Powder",
    description: "Sun-dried Guntur chilies ground for deep colour and heat.",
    price: 24900,
    stock: 60,
    category: "Powders",
    tags: &["chili", "powder"],
  },
];

pub async fn seed(pool: &PgPool, admin_password: &str) -> anyhow::Result<()> {
  let password_hash = auth_service::hash_password(admin_password).context("hashing seed admin password")?;
  let inserted = sqlx::query(
    "INSERT INTO users (id, name, email, password_hash, role) VALUES ($1, $2, $3, $4, $5) \
     ON CONFLICT (email) DO NOTHING",
  )
  .bind(Uuid::new_v4())
  .bind("Admin")
  .bind(ADMIN_EMAIL)
  .bind(password_hash)
  .bind(UserRole::Admin)
  .execute(pool)
  .await
  .context("seeding admin user")?;
  info!(created = inserted.rows_affected() > 0, email = ADMIN_EMAIL, "Admin account seeded.");

  for product in &SEED_PRODUCTS {
    let tags: Vec<&str> = product.tags.to_vec();
    sqlx::query(
      "INSERT INTO products (id, slug, name, description, price, stock, category, tags, images) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, '[]'::jsonb) ON CONFLICT (slug) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(product.slug)
    .bind(product.name)
    .bind(product.description)
    .bind(product.price)
    .bind(product.stock)
    .bind(product.category)
    .bind(Json(tags))
    .execute(pool)
    .await
    .with_context(|| format!("seeding product '{}'", product.slug))?;
  }
  info!(products = SEED_PRODUCTS.len(), "Catalog seeded.");
  Ok(())
}
